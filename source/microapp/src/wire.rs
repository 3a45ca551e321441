//! Arduino `Wire`: I2C through the host firmware.
//!
//! Writes are collected locally between
//! [`begin_transmission`](Wire::begin_transmission) and
//! [`end_transmission`](Wire::end_transmission) and sent as one transfer.
//! Bytes read with [`request_from`](Wire::request_from) are kept until taken
//! with [`read`](Wire::read).

use abi::sdk::{
    twi::{TwiCommand, TwiOp, MAX_TWI_DATA},
    SdkType,
};
use heapless::{Deque, Vec};

use crate::{Error, Microapp, Platform};

pub struct WireState {
    address: Option<u8>,
    tx: Vec<u8, MAX_TWI_DATA>,
    rx: Deque<u8, MAX_TWI_DATA>,
}

pub struct Wire<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl WireState {
    pub(crate) fn new() -> Self {
        Self {
            address: None,
            tx: Vec::new(),
            rx: Deque::new(),
        }
    }
}

impl<'a, P: Platform> Wire<'a, P> {
    pub fn begin(&mut self) -> Result<(), Error> {
        self.transfer(TwiOp::Init, 0, true, 0, Vec::new()).map(|_| ())
    }

    pub fn begin_transmission(&mut self, address: u8) {
        let state = &mut self.app.wire;
        state.address = Some(address);
        state.tx.clear();
    }

    /// Queue `byte` for the current transmission. Returns the number of
    /// bytes queued, 0 if there is no transmission or it is full.
    pub fn write(&mut self, byte: u8) -> usize {
        let state = &mut self.app.wire;
        if state.address.is_none() {
            return 0;
        }
        match state.tx.push(byte) {
            Ok(()) => 1,
            Err(_) => 0,
        }
    }

    pub fn write_all(&mut self, data: &[u8]) -> usize {
        data.iter().map(|byte| self.write(*byte)).sum()
    }

    /// Send the queued bytes. Fails with [`Error::InvalidArgument`] without
    /// a preceding [`begin_transmission`](Self::begin_transmission).
    pub fn end_transmission(&mut self, stop: bool) -> Result<(), Error> {
        let state = &mut self.app.wire;
        let address = state.address.take().ok_or(Error::InvalidArgument)?;
        let data = core::mem::take(&mut state.tx);
        let len = data.len() as u8;
        self.transfer(TwiOp::Write, address, stop, len, data)
            .map(|_| ())
    }

    /// Read up to `len` bytes from `address`. Returns how many arrived.
    pub fn request_from(&mut self, address: u8, len: usize, stop: bool) -> Result<usize, Error> {
        if len > MAX_TWI_DATA {
            return Err(Error::PayloadTooLarge { len });
        }
        let response = self.transfer(TwiOp::Read, address, stop, len as u8, Vec::new())?;

        let rx = &mut self.app.wire.rx;
        rx.clear();
        for byte in response.data.iter().take(len) {
            // rx and the response share a capacity
            let _ = rx.push_back(*byte);
        }
        Ok(rx.len())
    }

    /// Number of received bytes not yet read.
    pub fn available(&self) -> usize {
        self.app.wire.rx.len()
    }

    pub fn read(&mut self) -> Option<u8> {
        self.app.wire.rx.pop_front()
    }

    fn transfer(
        &mut self,
        op: TwiOp,
        address: u8,
        stop: bool,
        len: u8,
        data: Vec<u8, MAX_TWI_DATA>,
    ) -> Result<TwiCommand, Error> {
        let command = TwiCommand {
            op,
            address,
            stop,
            len,
            data,
        };
        self.app.request(SdkType::Twi, &command)
    }
}
