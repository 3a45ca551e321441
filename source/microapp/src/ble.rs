//! BLE scanning, connections and the soft-interrupt completion protocol.
//!
//! User handlers are attached to *soft-interrupt contexts*, kept in their own
//! table. Every context for a given [`BleEventType`] hangs off one core
//! interrupt registration, so several handlers may watch the same event.
//!
//! While the host firmware delivers a BLE event it waits for the microapp to
//! report back. Once the handlers have run, exactly one completion request is
//! sent: [`InterruptOp::End`] if any handler ran, [`InterruptOp::Error`] if
//! none did. Only then is a one-shot context free for reuse.
//!
//! A context registered without a handler is freed once an
//! [`InterruptOp::Error`] completion has reported it. If it fires alongside a
//! context that does have a handler, the completion is `End`, and the
//! handlerless context stays until an event nothing handles.

use core::fmt;

use abi::{
    address::MacAddress,
    sdk::{
        self,
        ble::{BleCommand, BleEvent, BleEventType},
        Ack, InterruptCommand, InterruptOp, SdkType,
    },
};

use crate::{
    interrupts::{InterruptKey, InterruptTable, Lifetime, Registration, SlotId},
    settings::MAX_BLE_INTERRUPTS,
    Error, Microapp, Platform, ShimSettings,
};

pub type BleHandler<P> = fn(&mut Microapp<P>, &BleEvent);

/// Where a soft-interrupt context is in its delivery cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// A handler is attached and waiting for an event.
    Armed,
    /// Registered without a handler; an event for it is reported as an error.
    NoHandler,
    /// The handler is running, or a one-shot handler has run and the
    /// completion is not sent yet.
    Dispatching,
}

pub struct SoftInterrupt<P: Platform> {
    handler: Option<BleHandler<P>>,
    lifetime: Lifetime,
    state: ContextState,
}

pub struct BleState<P: Platform> {
    contexts: InterruptTable<BleEventType, SoftInterrupt<P>, MAX_BLE_INTERRUPTS>,
}

pub struct Ble<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

// === impl BleState ===

impl<P: Platform> BleState<P> {
    pub(crate) fn new(settings: &ShimSettings) -> Self {
        Self {
            contexts: InterruptTable::new(settings.max_ble_interrupts),
        }
    }
}

impl<P: Platform> fmt::Debug for BleState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleState")
            .field("contexts", &self.contexts)
            .finish()
    }
}

// === impl Ble ===

impl<'a, P: Platform> Ble<'a, P> {
    pub fn scan(&mut self) -> Result<(), Error> {
        self.command(BleCommand::ScanStart)
    }

    pub fn stop_scan(&mut self) -> Result<(), Error> {
        self.command(BleCommand::ScanStop)
    }

    /// Start connecting to `address`. The outcome arrives as a
    /// [`BleEventType::Connected`] event.
    pub fn connect(&mut self, address: MacAddress) -> Result<(), Error> {
        self.command(BleCommand::Connect { address })
    }

    /// Like [`connect`](Self::connect), with an `AA:BB:CC:DD:EE:FF` address.
    ///
    /// A malformed address is rejected before anything is sent.
    pub fn connect_str(&mut self, address: &str) -> Result<(), Error> {
        let address = address.parse::<MacAddress>().map_err(|error| {
            tracing::debug!(%error, "invalid MAC address");
            Error::InvalidArgument
        })?;
        self.connect(address)
    }

    pub fn disconnect(&mut self, handle: u16) -> Result<(), Error> {
        self.command(BleCommand::Disconnect { handle })
    }

    /// Run `handler` for every `event_type` event until it is removed.
    pub fn set_event_handler(
        &mut self,
        event_type: BleEventType,
        handler: BleHandler<P>,
    ) -> Result<SlotId, Error> {
        self.register_soft_interrupt(event_type, Some(handler), Lifetime::Persistent)
    }

    /// Run `handler` for the next `event_type` event only.
    pub fn once(&mut self, event_type: BleEventType, handler: BleHandler<P>) -> Result<SlotId, Error> {
        self.register_soft_interrupt(event_type, Some(handler), Lifetime::OneShot)
    }

    /// Allocate a soft-interrupt context for `event_type`.
    ///
    /// Each call takes a fresh context, even for an event type that already
    /// has one. Fails with [`Error::NoSpace`] when all contexts are in use.
    pub fn register_soft_interrupt(
        &mut self,
        event_type: BleEventType,
        handler: Option<BleHandler<P>>,
        lifetime: Lifetime,
    ) -> Result<SlotId, Error> {
        let state = match handler {
            Some(_) => ContextState::Armed,
            None => ContextState::NoHandler,
        };
        let context = SoftInterrupt {
            handler,
            lifetime,
            state,
        };
        let id = self
            .app
            .ble
            .contexts
            .insert(event_type, context)
            .map_err(|error| {
                tracing::warn!(?event_type, "no free BLE soft-interrupt context");
                error
            })?;

        let registration = Registration::persistent(
            InterruptKey::new(SdkType::Ble, event_type.into()),
            dispatch::<P>,
            usize::from(u8::from(event_type)),
        );
        if let Err(error) = self.app.register_interrupt(registration) {
            self.app.ble.contexts.remove(id);
            return Err(error);
        }

        tracing::debug!(?event_type, slot = id.index(), "armed BLE soft interrupt");
        Ok(id)
    }

    /// Detach a context. Returns `false` if it was already free.
    pub fn remove_handler(&mut self, id: SlotId) -> bool {
        self.app.ble.contexts.remove(id).is_some()
    }

    pub fn context_state(&self, id: SlotId) -> Option<ContextState> {
        self.app.ble.contexts.get(id).map(|ctx| ctx.state)
    }

    /// Number of contexts in use.
    pub fn contexts(&self) -> usize {
        self.app.ble.contexts.len()
    }

    fn command(&mut self, command: BleCommand) -> Result<(), Error> {
        self.app.request(SdkType::Ble, &command).map(|_| ())
    }
}

/// The core interrupt handler shared by every BLE event type.
fn dispatch<P: Platform>(app: &mut Microapp<P>, context: usize, body: &[u8]) -> Ack {
    let event_type = match u8::try_from(context)
        .ok()
        .and_then(|raw| BleEventType::try_from(raw).ok())
    {
        Some(event_type) => event_type,
        None => return Ack::ErrUndefined,
    };

    let ids = app.ble.contexts.ids_for(&event_type);
    let mut handled = false;
    let ack = match sdk::decode_body::<BleEvent>(body) {
        Ok(event) if event.event_type() == event_type => {
            for id in ids.iter().copied() {
                handled |= run_context(app, id, &event);
            }
            if handled {
                Ack::Success
            } else {
                Ack::ErrNotFound
            }
        }
        Ok(event) => {
            tracing::warn!(?event_type, got = ?event.event_type(), "BLE event under the wrong id");
            Ack::ErrUndefined
        }
        Err(error) => {
            tracing::warn!(?event_type, %error, "malformed BLE event");
            Ack::ErrUndefined
        }
    };

    let op = if handled {
        InterruptOp::End
    } else {
        InterruptOp::Error
    };
    let completion = InterruptCommand::completion(op, SdkType::Ble, event_type.into());
    if let Err(error) = app.request(SdkType::Interrupt, &completion) {
        tracing::warn!(?event_type, ?op, %error, "failed to complete BLE interrupt");
    }

    for id in ids {
        let Some(context) = app.ble.contexts.get(id) else {
            continue;
        };
        let spent = match context.state {
            ContextState::NoHandler => op == InterruptOp::Error,
            ContextState::Dispatching => context.lifetime == Lifetime::OneShot,
            ContextState::Armed => false,
        };
        if spent {
            app.ble.contexts.remove(id);
        }
    }

    ack
}

/// Run one context's handler. Returns whether a handler ran.
fn run_context<P: Platform>(app: &mut Microapp<P>, id: SlotId, event: &BleEvent) -> bool {
    let Some(context) = app.ble.contexts.get_mut(id) else {
        return false;
    };
    let Some(handler) = context.handler else {
        context.state = ContextState::NoHandler;
        return false;
    };

    context.state = ContextState::Dispatching;
    let lifetime = context.lifetime;
    handler(app, event);

    // one-shot contexts are freed once the completion is out
    if lifetime == Lifetime::Persistent {
        if let Some(context) = app.ble.contexts.get_mut(id) {
            context.state = ContextState::Armed;
        }
    }
    true
}
