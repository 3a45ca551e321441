//! The outgoing message buffer.

use abi::{
    sdk::{self, Header, SdkType},
    MAX_PAYLOAD,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

/// The one request/response envelope.
///
/// A request is written into the payload, handed to the host firmware, and
/// the response is read back out of the same bytes. `len` is not checked
/// here: [`Microapp::send_message`](crate::Microapp::send_message) refuses to
/// send anything longer than [`MAX_PAYLOAD`].
pub struct Message {
    payload: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Message {
    pub const fn new() -> Self {
        Self {
            payload: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// The raw payload, for callers that lay out a request by hand.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8; MAX_PAYLOAD] {
        &mut self.payload
    }

    #[inline]
    pub fn payload(&self) -> &[u8; MAX_PAYLOAD] {
        &self.payload
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the request length. Any value is accepted here.
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    /// Replace the buffer contents with a request for `sdk_type`.
    pub fn write_request<T: Serialize>(&mut self, sdk_type: SdkType, body: &T) -> Result<usize, Error> {
        self.payload.fill(0);
        let used = sdk::encode_request(sdk_type, body, &mut self.payload)
            .map_err(|_| Error::Encode)?
            .len();
        self.len = used;
        Ok(used)
    }

    pub fn header(&self) -> Result<Header, Error> {
        sdk::split_message(&self.payload)
            .map(|(header, _)| header)
            .map_err(|_| Error::Decode)
    }

    /// Read the header and body the host wrote over the request.
    pub fn read_response<T: DeserializeOwned>(&self) -> Result<(Header, T), Error> {
        sdk::decode_message(&self.payload).map_err(|_| Error::Decode)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}
