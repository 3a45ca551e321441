//! # microapp
//!
//! The microapp side of the microapp/host firmware split. A microapp is a
//! small `setup()`/`loop()` program, linked on its own and loaded by the host
//! firmware, which owns the radio, the mesh and the switch. This crate is the
//! shim between the two.
//!
//! ## Talking to the host firmware
//!
//! There is exactly one outgoing [`Message`](buffer::Message). Every call
//! that needs the host firmware writes a request into it (an
//! [`abi::sdk::Header`] plus a typed body), hands it to the host callback
//! with [`Microapp::send_message`], and reads the response back out of the
//! same buffer. [`Microapp::request`] does all three steps.
//!
//! The host callback is discovered through IPC RAM: at boot the microapp
//! publishes its own `setup`/`loop` addresses there (see [`ipc`]), and on its
//! first request it looks up the host's callback address.
//!
//! ## Soft interrupts
//!
//! The host firmware calls back into the microapp for things the microapp
//! did not ask for right then: scanned advertisements, mesh messages, pin
//! changes. Those arrive in their own event buffer through
//! [`Microapp::dispatch_interrupt`], and are routed through the
//! [`interrupts`] table to the subsystem that registered for them. Since the
//! event buffer is not the outgoing message, a handler is free to send
//! requests of its own.
//!
//! The host may also raise an interrupt while the microapp is waiting on a
//! request (in [`delay`](Microapp::delay), say). It then answers the call
//! with [`INTERRUPT_PENDING`](abi::sdk::INTERRUPT_PENDING) instead of a
//! response, and [`Microapp::send_message`] dispatches the event before
//! handing the request back.
//!
//! ## Single threaded
//!
//! Everything lives in one [`Microapp`] value, passed by `&mut` to every
//! call and every handler. Nothing here is protected against concurrent
//! access: there is one thread of control, shared with the host firmware by
//! plain function calls. A port to a preemptive host must put the whole
//! `Microapp` behind one lock, covering each populate, send and read
//! sequence.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]

pub use abi;

pub mod ble;
pub mod buffer;
pub mod error;
pub mod events;
pub mod interrupts;
pub mod ipc;
pub mod mesh;
pub mod message;
pub mod pin;
pub mod power;
#[cfg(feature = "rt")]
pub mod rt;
pub mod serial;
pub mod settings;
pub mod switch;
pub mod time;
pub mod transport;
pub mod utils;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_util;
#[cfg(test)]
mod tests;

use abi::{ipc::IpcRam, MAX_PAYLOAD};

use crate::{
    buffer::Message,
    interrupts::{InterruptTable, Registration},
    settings::MAX_INTERRUPTS,
};
pub use crate::{error::Error, settings::ShimSettings};

/// What the microapp needs from the world outside it.
pub trait Platform {
    type Ipc: IpcRam;

    fn ipc(&self) -> &Self::Ipc;

    fn ipc_mut(&mut self) -> &mut Self::Ipc;

    /// Call the host firmware's callback at `callback` with the outgoing
    /// buffer, of which the first `len` bytes are the request, and the
    /// microapp's interrupt buffer.
    ///
    /// The host either overwrites `buffer` with its response, or writes an
    /// event into `interrupt` and returns
    /// [`INTERRUPT_PENDING`](abi::sdk::INTERRUPT_PENDING).
    ///
    /// # Safety
    ///
    /// `callback` must be the address the host firmware published in IPC
    /// RAM. Nothing else may be turned into a function pointer.
    unsafe fn invoke(
        &mut self,
        callback: usize,
        buffer: &mut [u8; MAX_PAYLOAD],
        len: usize,
        interrupt: &mut [u8; MAX_PAYLOAD],
    ) -> i32;

    /// Address of the microapp's interrupt entry point, announced to the
    /// host firmware when registering an interrupt.
    fn interrupt_entry(&self) -> usize;
}

/// The process-wide microapp state.
pub struct Microapp<P: Platform> {
    platform: P,
    settings: ShimSettings,
    message: Message,
    /// Where the host writes interrupts raised during a request.
    interrupt: [u8; MAX_PAYLOAD],
    host_callback: Option<usize>,
    interrupts: InterruptTable<interrupts::InterruptKey, Registration<P>, MAX_INTERRUPTS>,
    ble: ble::BleState<P>,
    mesh: mesh::MeshState<P>,
    messages: message::MessageState<P>,
    events: events::EventState<P>,
    pins: pin::PinState<P>,
    wire: wire::WireState,
}

impl<P: Platform> Microapp<P> {
    pub fn new(platform: P, settings: ShimSettings) -> Self {
        tracing::debug!(?settings, "creating microapp context");
        Self {
            interrupts: InterruptTable::new(settings.max_interrupts),
            ble: ble::BleState::new(&settings),
            mesh: mesh::MeshState::new(&settings),
            messages: message::MessageState::new(&settings),
            events: events::EventState::new(&settings),
            pins: pin::PinState::new(&settings),
            wire: wire::WireState::new(),
            message: Message::new(),
            interrupt: [0; MAX_PAYLOAD],
            host_callback: None,
            platform,
            settings,
        }
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    #[inline]
    pub fn settings(&self) -> &ShimSettings {
        &self.settings
    }

    pub fn ble(&mut self) -> ble::Ble<'_, P> {
        ble::Ble { app: self }
    }

    pub fn mesh(&mut self) -> mesh::Mesh<'_, P> {
        mesh::Mesh { app: self }
    }

    pub fn messages(&mut self) -> message::Messages<'_, P> {
        message::Messages { app: self }
    }

    pub fn events(&mut self) -> events::Events<'_, P> {
        events::Events { app: self }
    }

    pub fn pins(&mut self) -> pin::Pins<'_, P> {
        pin::Pins { app: self }
    }

    pub fn serial(&mut self) -> serial::Serial<'_, P> {
        serial::Serial { app: self }
    }

    pub fn wire(&mut self) -> wire::Wire<'_, P> {
        wire::Wire { app: self }
    }

    pub fn switch(&mut self) -> switch::Switch<'_, P> {
        switch::Switch { app: self }
    }
}
