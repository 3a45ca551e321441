#![cfg_attr(not(any(test, feature = "use-std")), no_std)]
#![doc = include_str!("../README.md")]

use core::fmt;

/// Declares a one-byte wire enum.
///
/// The enum is serialized as its raw discriminant (not as a postcard varint
/// variant index), so a header made of these types occupies exactly one byte
/// per field and can be patched in place by the other side.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $val:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
        #[serde(into = "u8", try_from = "u8")]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $val,
            )+
        }

        impl From<$name> for u8 {
            #[inline]
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::UnknownValue;

            fn try_from(value: u8) -> Result<Self, $crate::UnknownValue> {
                match value {
                    $( $val => Ok(Self::$variant), )+
                    value => Err($crate::UnknownValue {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }
        }
    };
}

pub mod address;
pub mod ipc;
pub mod sdk;

/// Maximum size of a single message, header included.
///
/// This is the size of the one outgoing buffer a microapp owns, and of the
/// interrupt buffer the host firmware uses for events.
pub const MAX_PAYLOAD: usize = 48;

/// Returned when a byte does not correspond to any variant of a wire enum.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: u8,
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value 0x{:02X}", self.kind, self.value)
    }
}
