use abi::{
    ipc::IpcError,
    sdk::{Ack, SdkType},
};
use core::fmt;

/// Errors returned by microapp operations.
///
/// Nothing in the shim retries on error; every error goes straight back to
/// the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The outgoing message is longer than the one payload slot.
    PayloadTooLarge { len: usize },
    /// No host callback has been published (or it was published with an
    /// unsupported protocol version).
    NoCallback,
    /// The host callback itself returned a non-zero result.
    Host(i32),
    /// The host answered with a header for a different command family.
    Mismatch { sent: SdkType, received: SdkType },
    /// The host returned without writing a result code.
    Unanswered,
    /// The host answered with a failure result code.
    Rejected(Ack),
    /// A fixed-capacity table or buffer is full.
    NoSpace,
    /// An argument was rejected before anything was sent.
    InvalidArgument,
    /// The request could not be serialized into the outgoing buffer.
    Encode,
    /// The response could not be deserialized.
    Decode,
    /// IPC RAM could not be read or written.
    Ipc(IpcError),
}

impl Error {
    /// The ack code that best describes this error, for reporting it back to
    /// the host firmware.
    pub fn as_ack(&self) -> Ack {
        match self {
            Self::PayloadTooLarge { .. } => Ack::ErrTooLarge,
            Self::NoSpace => Ack::ErrNoSpace,
            Self::Rejected(ack) => *ack,
            _ => Ack::Error,
        }
    }
}

impl From<IpcError> for Error {
    fn from(error: IpcError) -> Self {
        Self::Ipc(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { len } => write!(
                f,
                "message of {len} bytes exceeds the {} byte payload",
                abi::MAX_PAYLOAD
            ),
            Self::NoCallback => f.write_str("no host callback available"),
            Self::Host(code) => write!(f, "host callback failed with {code}"),
            Self::Mismatch { sent, received } => {
                write!(f, "sent a {sent:?} request but received a {received:?} response")
            }
            Self::Unanswered => f.write_str("host did not acknowledge the request"),
            Self::Rejected(ack) => write!(f, "host rejected the request: {ack:?}"),
            Self::NoSpace => f.write_str("no space left"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::Encode => f.write_str("request does not fit the outgoing buffer"),
            Self::Decode => f.write_str("malformed response"),
            Self::Ipc(error) => write!(f, "IPC RAM: {error}"),
        }
    }
}
