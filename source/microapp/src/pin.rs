//! Arduino style GPIO.

use abi::sdk::{
    self,
    pin::{Edge, PinCommand, PinEvent, PinMode, PinOp},
    Ack, SdkType,
};

use crate::{
    interrupts::{InterruptKey, InterruptTable, Registration},
    settings::MAX_PIN_INTERRUPTS,
    Error, Microapp, Platform, ShimSettings,
};

pub type PinHandler<P> = fn(&mut Microapp<P>, PinEvent);

pub struct PinState<P: Platform> {
    handlers: InterruptTable<u8, PinHandler<P>, MAX_PIN_INTERRUPTS>,
}

pub struct Pins<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<P: Platform> PinState<P> {
    pub(crate) fn new(settings: &ShimSettings) -> Self {
        Self {
            handlers: InterruptTable::new(settings.max_pin_interrupts),
        }
    }
}

impl<'a, P: Platform> Pins<'a, P> {
    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Error> {
        self.command(pin, PinOp::Init { mode }).map(|_| ())
    }

    pub fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), Error> {
        self.command(pin, PinOp::Write { high }).map(|_| ())
    }

    pub fn digital_read(&mut self, pin: u8) -> Result<bool, Error> {
        match self.command(pin, PinOp::Read { high: false })? {
            PinOp::Read { high } => Ok(high),
            _ => Err(Error::Decode),
        }
    }

    /// Call `handler` on every `edge` transition of `pin`.
    ///
    /// Attaching to a pin that already has a handler replaces the handler
    /// and the edge.
    pub fn attach_interrupt(
        &mut self,
        pin: u8,
        edge: Edge,
        handler: PinHandler<P>,
    ) -> Result<(), Error> {
        // the slot now holding `handler`, and what it held before
        let handlers = &mut self.app.pins.handlers;
        let (id, previous) = match handlers.find(&pin) {
            Some(id) => {
                let previous = handlers
                    .get_mut(id)
                    .map(|slot| core::mem::replace(slot, handler));
                (id, previous)
            }
            None => (handlers.insert(pin, handler)?, None),
        };

        let registration = Registration::persistent(
            InterruptKey::new(SdkType::Pin, pin),
            on_pin_event::<P>,
            usize::from(pin),
        );
        let res = self
            .app
            .register_interrupt(registration)
            .and_then(|_| self.command(pin, PinOp::Interrupt { edge }).map(|_| ()));
        if let Err(error) = &res {
            tracing::debug!(pin, %error, "pin interrupt not attached");
            let handlers = &mut self.app.pins.handlers;
            match previous {
                Some(previous) => {
                    if let Some(slot) = handlers.get_mut(id) {
                        *slot = previous;
                    }
                }
                None => {
                    handlers.remove(id);
                }
            }
        }
        res
    }

    fn command(&mut self, pin: u8, op: PinOp) -> Result<PinOp, Error> {
        self.app
            .request(SdkType::Pin, &PinCommand { pin, op })
            .map(|response| response.op)
    }
}

fn on_pin_event<P: Platform>(app: &mut Microapp<P>, context: usize, body: &[u8]) -> Ack {
    let Ok(pin) = u8::try_from(context) else {
        return Ack::ErrUndefined;
    };
    let Some(handler) = app
        .pins
        .handlers
        .find(&pin)
        .and_then(|id| app.pins.handlers.get(id).copied())
    else {
        return Ack::ErrNotFound;
    };

    match sdk::decode_body::<PinEvent>(body) {
        Ok(event) => {
            handler(app, event);
            Ack::Success
        }
        Err(error) => {
            tracing::warn!(pin, %error, "malformed pin event");
            Ack::ErrUndefined
        }
    }
}
