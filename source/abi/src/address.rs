//! MAC addresses and BLE UUIDs, in both their string and over-the-air forms.
//!
//! Over the air (and therefore on the wire between microapp and host
//! firmware) both are little-endian. Their string forms are written most
//! significant byte first.

use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};

/// A BLE device address, stored in over-the-air (little-endian) order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);

/// A 16-bit SIG assigned UUID or a full 128-bit UUID.
///
/// Long UUIDs are stored in over-the-air (little-endian) order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum BleUuid {
    Short(u16),
    Long([u8; 16]),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The string has the wrong number of characters.
    Length,
    /// A character that should be a hex digit is not.
    InvalidHex,
    /// A separator (`:` or `-`) is missing or in the wrong place.
    Separator,
}

/// `00000000-0000-1000-8000-00805F9B34FB`, little-endian.
const BASE_UUID: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

// Offsets into the little-endian 16 byte array where the 16 bit part of a
// short UUID lives inside the base UUID.
const SHORT_UUID_OFFSET: usize = 12;

// String positions (in the 36 character dashed form) of the dashes.
const UUID_DASHES: [usize; 4] = [8, 13, 18, 23];

fn hex_nibble(c: u8) -> Result<u8, ParseError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ParseError::InvalidHex),
    }
}

fn hex_byte(hi: u8, lo: u8) -> Result<u8, ParseError> {
    Ok((hex_nibble(hi)? << 4) | hex_nibble(lo)?)
}

// === impl MacAddress ===

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 17 {
            return Err(ParseError::Length);
        }

        let mut out = [0u8; 6];
        for (i, chunk) in s.chunks(3).enumerate() {
            if let Some(sep) = chunk.get(2) {
                if *sep != b':' {
                    return Err(ParseError::Separator);
                }
            }
            out[5 - i] = hex_byte(chunk[0], chunk[1])?;
        }
        Ok(Self(out))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{g:02X}:{e:02X}:{d:02X}:{c:02X}:{b:02X}:{a:02X}")
    }
}

// === impl BleUuid ===

impl BleUuid {
    /// The full 128-bit form, expanding short UUIDs onto the Bluetooth base
    /// UUID.
    pub fn to_long(&self) -> [u8; 16] {
        match *self {
            Self::Long(bytes) => bytes,
            Self::Short(short) => {
                let mut bytes = BASE_UUID;
                bytes[SHORT_UUID_OFFSET..SHORT_UUID_OFFSET + 2]
                    .copy_from_slice(&short.to_le_bytes());
                bytes
            }
        }
    }

    /// Whether both UUIDs refer to the same 128-bit value.
    pub fn matches(&self, other: &Self) -> bool {
        self.to_long() == other.to_long()
    }
}

impl FromStr for BleUuid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        match s.len() {
            4 => {
                let hi = hex_byte(s[0], s[1])?;
                let lo = hex_byte(s[2], s[3])?;
                Ok(Self::Short(u16::from_be_bytes([hi, lo])))
            }
            36 => {
                if UUID_DASHES.iter().any(|&i| s[i] != b'-') {
                    return Err(ParseError::Separator);
                }
                let mut out = [0u8; 16];
                let mut digits = s.iter().enumerate().filter(|(i, _)| !UUID_DASHES.contains(i));
                for byte in out.iter_mut().rev() {
                    let (Some((_, hi)), Some((_, lo))) = (digits.next(), digits.next()) else {
                        return Err(ParseError::Length);
                    };
                    *byte = hex_byte(*hi, *lo)?;
                }
                Ok(Self::Long(out))
            }
            _ => Err(ParseError::Length),
        }
    }
}

impl fmt::Display for BleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(short) => write!(f, "{short:04X}"),
            Self::Long(bytes) => {
                for (i, byte) in bytes.iter().rev().enumerate() {
                    if matches!(i, 4 | 6 | 8 | 10) {
                        f.write_str("-")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

// === impl ParseError ===

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => f.write_str("wrong length"),
            Self::InvalidHex => f.write_str("invalid hex digit"),
            Self::Separator => f.write_str("missing or misplaced separator"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mac_is_stored_reversed() {
        let mac: MacAddress = "01:23:45:67:89:AB".parse().unwrap();
        assert_eq!(mac.0, [0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]);
        assert_eq!(mac.to_string(), "01:23:45:67:89:AB");
    }

    #[test]
    fn mac_lowercase_accepted() {
        let mac: MacAddress = "de:ad:be:ef:00:01".parse().unwrap();
        assert_eq!(mac.to_string(), "DE:AD:BE:EF:00:01");
    }

    #[test]
    fn bad_macs() {
        assert_eq!("01:23:45".parse::<MacAddress>(), Err(ParseError::Length));
        assert_eq!(
            "01-23-45-67-89-AB".parse::<MacAddress>(),
            Err(ParseError::Separator)
        );
        assert_eq!(
            "0G:23:45:67:89:AB".parse::<MacAddress>(),
            Err(ParseError::InvalidHex)
        );
    }

    #[test]
    fn short_uuid() {
        let uuid: BleUuid = "180D".parse().unwrap();
        assert_eq!(uuid, BleUuid::Short(0x180D));
        assert_eq!(uuid.to_string(), "180D");
    }

    #[test]
    fn long_uuid() {
        let s = "24F00000-7D10-4805-BFC1-7663A01C3BFF";
        let uuid: BleUuid = s.parse().unwrap();
        let BleUuid::Long(bytes) = uuid else {
            panic!("expected a long uuid, got {uuid:?}");
        };
        assert_eq!(bytes[15], 0x24);
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(uuid.to_string(), s);
    }

    #[test]
    fn short_matches_expanded_long() {
        let short = BleUuid::Short(0x180D);
        let long: BleUuid = "0000180D-0000-1000-8000-00805F9B34FB".parse().unwrap();
        assert!(short.matches(&long));
        assert_ne!(short, long);
    }

    #[test]
    fn bad_uuids() {
        assert_eq!("18".parse::<BleUuid>(), Err(ParseError::Length));
        assert_eq!("18XZ".parse::<BleUuid>(), Err(ParseError::InvalidHex));
        assert_eq!(
            "24F00000_7D10-4805-BFC1-7663A01C3BFF".parse::<BleUuid>(),
            Err(ParseError::Separator)
        );
    }
}
