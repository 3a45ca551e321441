//! I2C (two wire interface).

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum bytes moved by one I2C transfer.
pub const MAX_TWI_DATA: usize = 32;

wire_enum! {
    pub enum TwiOp {
        Init = 0,
        Read = 1,
        Write = 2,
    }
}

/// Body of an [`SdkType::Twi`](super::SdkType::Twi) message.
///
/// For [`TwiOp::Read`], `len` is the number of bytes requested and `data`
/// is empty in the request; the response carries the bytes read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwiCommand {
    pub op: TwiOp,
    pub address: u8,
    pub stop: bool,
    pub len: u8,
    pub data: Vec<u8, MAX_TWI_DATA>,
}
