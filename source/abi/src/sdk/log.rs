//! Log output, the backend of `Serial`.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum bytes of text or data in one log message.
pub const MAX_LOG_DATA: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogValue {
    Text(Vec<u8, MAX_LOG_DATA>),
    Int(i32),
    Bytes(Vec<u8, MAX_LOG_DATA>),
}

/// Body of an [`SdkType::Log`](super::SdkType::Log) message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCommand {
    pub newline: bool,
    pub value: LogValue,
}
