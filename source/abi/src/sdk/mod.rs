//! SDK message types and low level encoding helpers.
//!
//! Every message exchanged between a microapp and the host firmware starts
//! with a [`Header`]: the [`SdkType`] tag, then the [`Ack`] byte. The ack
//! byte is [`Ack::Request`] going out and is overwritten in place with a
//! result code by whoever handles the message. The type specific body
//! follows, postcard encoded. A response reuses the body type of its request,
//! with result fields filled in.
//!
//! Events the host raises asynchronously ("soft interrupts") use an
//! [`InterruptHeader`] instead, which adds the minor id the microapp
//! registered for.
//!
//! ## WARNING!
//!
//! Care must be taken when modifying these types! Non-additive changes,
//! including ANY field reordering **MUST** be considered a breaking change!

pub mod ble;
pub mod event;
pub mod log;
pub mod mesh;
pub mod pin;
pub mod power;
pub mod switch;
pub mod twi;

use serde::{Deserialize, Serialize};

/// Offset of the [`Ack`] byte in both [`Header`] and [`InterruptHeader`].
pub const ACK_OFFSET: usize = 1;

/// Encoded size of a [`Header`].
pub const HEADER_SIZE: usize = 2;

/// Encoded size of an [`InterruptHeader`].
pub const INTERRUPT_HEADER_SIZE: usize = 3;

/// Host callback result meaning "no response yet": the host has written an
/// interrupt event into the microapp's interrupt buffer instead. The microapp
/// handles the event, leaves its ack in that buffer, and calls back with the
/// same request.
pub const INTERRUPT_PENDING: i32 = 1;

wire_enum! {
    /// Which command family a message belongs to.
    pub enum SdkType {
        None = 0,
        Log = 1,
        Pin = 2,
        Switch = 3,
        Twi = 4,
        Ble = 5,
        Mesh = 6,
        PowerUsage = 7,
        Presence = 8,
        Yield = 9,
        Message = 10,
        BluenetEvent = 11,
        /// Interrupt registration and completion.
        Interrupt = 12,
    }
}

wire_enum! {
    /// Request marker going out, result code coming back.
    pub enum Ack {
        NoRequest = 0,
        Request = 1,
        InProgress = 2,
        Success = 3,
        Error = 4,
        ErrUndefined = 5,
        ErrNotFound = 6,
        ErrNoSpace = 7,
        ErrBusy = 8,
        ErrDisabled = 9,
        ErrEmpty = 10,
        ErrTooLarge = 11,
        ErrNotImplemented = 12,
        ErrAlreadyExists = 13,
    }
}

wire_enum! {
    pub enum InterruptOp {
        /// Ask the host to start raising interrupts for a key.
        Register = 1,
        /// The microapp finished handling an interrupt.
        End = 2,
        /// An interrupt arrived that nothing could handle.
        Error = 3,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Header {
    pub sdk_type: SdkType,
    pub ack: Ack,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct InterruptHeader {
    pub sdk_type: SdkType,
    pub ack: Ack,
    /// The minor id within `sdk_type`, e.g. a BLE event type or a pin.
    pub id: u8,
}

/// Body of an [`SdkType::Interrupt`] message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct InterruptCommand {
    pub op: InterruptOp,
    pub sdk_type: SdkType,
    pub id: u8,
    /// Address of the microapp's interrupt entry point. Only meaningful for
    /// [`InterruptOp::Register`].
    pub entry: usize,
}

/// Body of an [`SdkType::Yield`] message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct YieldCommand {
    /// How long the microapp wants to be suspended for.
    pub delay_ms: u32,
}

// === impl Ack ===

impl Ack {
    /// Whether the handler accepted the request.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::InProgress)
    }
}

// === impl Header ===

impl Header {
    #[inline]
    pub const fn request(sdk_type: SdkType) -> Self {
        Self {
            sdk_type,
            ack: Ack::Request,
        }
    }
}

// === impl InterruptHeader ===

impl InterruptHeader {
    #[inline]
    pub const fn event(sdk_type: SdkType, id: u8) -> Self {
        Self {
            sdk_type,
            ack: Ack::Request,
            id,
        }
    }
}

// === impl InterruptCommand ===

impl InterruptCommand {
    pub const fn register(sdk_type: SdkType, id: u8, entry: usize) -> Self {
        Self {
            op: InterruptOp::Register,
            sdk_type,
            id,
            entry,
        }
    }

    pub const fn completion(op: InterruptOp, sdk_type: SdkType, id: u8) -> Self {
        Self {
            op,
            sdk_type,
            id,
            entry: 0,
        }
    }
}

/// Encode a request (header with [`Ack::Request`], then `body`) into `buf`.
pub fn encode_request<'a, T: Serialize>(
    sdk_type: SdkType,
    body: &T,
    buf: &'a mut [u8],
) -> postcard::Result<&'a mut [u8]> {
    encode_message(Header::request(sdk_type), body, buf)
}

/// Encode a message with an explicit header into `buf`.
///
/// This is what the host firmware uses to write a response over a request.
pub fn encode_message<'a, T: Serialize>(
    header: Header,
    body: &T,
    buf: &'a mut [u8],
) -> postcard::Result<&'a mut [u8]> {
    postcard::to_slice(&(header, body), buf)
}

/// Split a message into its header and the undecoded body bytes.
pub fn split_message(buf: &[u8]) -> postcard::Result<(Header, &[u8])> {
    postcard::take_from_bytes::<Header>(buf)
}

/// Decode a message's header and body. Trailing bytes are ignored.
pub fn decode_message<'a, T: Deserialize<'a>>(buf: &'a [u8]) -> postcard::Result<(Header, T)> {
    let (header, rest) = split_message(buf)?;
    let (body, _) = postcard::take_from_bytes::<T>(rest)?;
    Ok((header, body))
}

/// Encode an interrupt event into `buf`.
pub fn encode_event<'a, T: Serialize>(
    header: InterruptHeader,
    body: &T,
    buf: &'a mut [u8],
) -> postcard::Result<&'a mut [u8]> {
    postcard::to_slice(&(header, body), buf)
}

/// Split an interrupt event into its header and the undecoded body bytes.
pub fn split_event(buf: &[u8]) -> postcard::Result<(InterruptHeader, &[u8])> {
    postcard::take_from_bytes::<InterruptHeader>(buf)
}

/// Decode the body of a message or event, ignoring trailing bytes.
pub fn decode_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> postcard::Result<T> {
    postcard::take_from_bytes::<T>(body).map(|(body, _)| body)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MAX_PAYLOAD;

    #[test]
    fn header_is_two_raw_bytes() {
        let mut buf = [0u8; MAX_PAYLOAD];
        let used = encode_request(SdkType::Switch, &(), &mut buf).unwrap().len();
        assert_eq!(used, HEADER_SIZE);
        assert_eq!(buf[0], 3);
        assert_eq!(buf[ACK_OFFSET], 1);
    }

    #[test]
    fn ack_patched_in_place() {
        let mut buf = [0u8; MAX_PAYLOAD];
        encode_request(SdkType::PowerUsage, &power::PowerUsageCommand { milliwatts: 0 }, &mut buf)
            .unwrap();
        buf[ACK_OFFSET] = Ack::ErrBusy.into();

        let (header, _) = split_message(&buf).unwrap();
        assert_eq!(header.sdk_type, SdkType::PowerUsage);
        assert_eq!(header.ack, Ack::ErrBusy);
    }

    #[test]
    fn unknown_ack_byte_fails_decode() {
        let buf = [SdkType::Log as u8, 0xEE];
        assert!(split_message(&buf).is_err());
    }

    #[test]
    fn interrupt_header_layout() {
        let mut buf = [0u8; MAX_PAYLOAD];
        let used = encode_event(InterruptHeader::event(SdkType::Ble, 4), &(), &mut buf)
            .unwrap()
            .len();
        assert_eq!(used, INTERRUPT_HEADER_SIZE);
        assert_eq!(&buf[..3], &[5, 1, 4]);
    }

    #[test]
    fn body_trailing_bytes_ignored() {
        let mut buf = [0xFFu8; MAX_PAYLOAD];
        encode_request(SdkType::Yield, &YieldCommand { delay_ms: 10 }, &mut buf).unwrap();
        let (header, body): (Header, YieldCommand) = decode_message(&buf).unwrap();
        assert_eq!(header, Header::request(SdkType::Yield));
        assert_eq!(body.delay_ms, 10);
    }

    #[test]
    fn success_acks() {
        assert!(Ack::Success.is_success());
        assert!(Ack::InProgress.is_success());
        assert!(!Ack::Request.is_success());
        assert!(!Ack::ErrNoSpace.is_success());
    }

    #[test]
    fn error_variants_convert_from_raw() {
        assert_eq!(Ack::try_from(4), Ok(Ack::Error));
        assert_eq!(InterruptOp::try_from(3), Ok(InterruptOp::Error));
        assert_eq!(u8::from(InterruptOp::Error), 3);

        let unknown = InterruptOp::try_from(0).unwrap_err();
        assert_eq!((unknown.kind, unknown.value), ("InterruptOp", 0));
    }
}
