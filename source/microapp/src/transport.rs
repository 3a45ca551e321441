//! Sending the outgoing message to the host firmware.

use abi::{
    sdk::{Ack, SdkType, INTERRUPT_PENDING},
    MAX_PAYLOAD,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{buffer::Message, ipc, Error, Microapp, Platform};

impl<P: Platform> Microapp<P> {
    /// The outgoing message, for requests laid out by hand.
    #[inline]
    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    #[inline]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Hand the outgoing message to the host firmware.
    ///
    /// Returns whatever the host callback returned. On return the message
    /// holds the host's response.
    ///
    /// While the host answers with [`INTERRUPT_PENDING`], the interrupt it
    /// raised is dispatched and the request is sent again, restored to what
    /// it was in case a handler sent requests of its own.
    ///
    /// Fails without calling anything if the message is longer than
    /// [`MAX_PAYLOAD`], or if no host callback is published.
    pub fn send_message(&mut self) -> Result<i32, Error> {
        let len = self.message.len();
        if len > MAX_PAYLOAD {
            tracing::warn!(len, max = MAX_PAYLOAD, "refusing to send oversized message");
            return Err(Error::PayloadTooLarge { len });
        }

        let callback = self.host_callback().ok_or(Error::NoCallback)?;
        let request = *self.message.payload();
        loop {
            tracing::trace!(len, callback, "sending message");

            // Safety: `callback` was read from the host's own IPC item and
            // has passed the protocol version check.
            let result = unsafe {
                self.platform.invoke(
                    callback,
                    self.message.payload_mut(),
                    len,
                    &mut self.interrupt,
                )
            };
            if result != INTERRUPT_PENDING {
                tracing::trace!(result, "host returned");
                return Ok(result);
            }

            self.handle_pending_interrupt();
            *self.message.payload_mut() = request;
            self.message.set_len(len);
        }
    }

    /// Dispatch the event the host left in the interrupt buffer. Its ack is
    /// written back there for the host to read on the next call.
    fn handle_pending_interrupt(&mut self) {
        // handlers may send requests, which reuse the interrupt buffer
        let mut event = self.interrupt;
        let ack = self.dispatch_interrupt(&mut event);
        tracing::debug!(?ack, "handled interrupt raised during a request");
        self.interrupt = event;
    }

    /// Send `body` as an `sdk_type` request and decode the response body.
    ///
    /// This is the populate, send and read sequence every domain call goes
    /// through.
    pub fn request<T>(&mut self, sdk_type: SdkType, body: &T) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
    {
        self.message.write_request(sdk_type, body)?;
        match self.send_message()? {
            0 => {}
            code => {
                tracing::debug!(?sdk_type, code, "host callback failed");
                return Err(Error::Host(code));
            }
        }

        let header = self.message.header()?;
        if header.sdk_type != sdk_type {
            tracing::warn!(sent = ?sdk_type, received = ?header.sdk_type, "response type mismatch");
            return Err(Error::Mismatch {
                sent: sdk_type,
                received: header.sdk_type,
            });
        }
        match header.ack {
            Ack::Request | Ack::NoRequest => return Err(Error::Unanswered),
            ack if !ack.is_success() => {
                tracing::debug!(?sdk_type, ?ack, "request rejected");
                return Err(Error::Rejected(ack));
            }
            _ => {}
        }

        let (_, response) = self.message.read_response::<T>()?;
        Ok(response)
    }

    /// The host callback address, read from IPC RAM on first use.
    fn host_callback(&mut self) -> Option<usize> {
        if let Some(callback) = self.host_callback {
            return Some(callback);
        }

        match ipc::host_callback(self.platform.ipc()) {
            Ok(callback) => {
                tracing::debug!(callback, "found host callback");
                self.host_callback = Some(callback);
                Some(callback)
            }
            Err(error) => {
                tracing::debug!(%error, "no host callback");
                None
            }
        }
    }
}
