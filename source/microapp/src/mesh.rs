//! Crownstone mesh messaging.
//!
//! Incoming messages are either buffered until read ([`Mesh::listen`]) or
//! pushed to a handler as they arrive ([`Mesh::set_incoming_handler`]).
//! Setting a handler switches to push mode for good: messages buffered
//! before that stay in the buffer and are never handed to the handler.

use abi::sdk::{
    self,
    mesh::{MeshCommand, MeshEvent, MeshEventType},
    Ack, SdkType,
};
use heapless::Vec;

use crate::{
    interrupts::{InterruptKey, Registration},
    settings::MESH_BUFFER_SLOTS,
    Error, Microapp, Platform, ShimSettings,
};

pub type MeshHandler<P> = fn(&mut Microapp<P>, &MeshEvent);

const KEY: InterruptKey = InterruptKey::new(SdkType::Mesh, MeshEventType::Received as u8);

enum Mode<P: Platform> {
    Buffered,
    Push(MeshHandler<P>),
}

pub struct MeshState<P: Platform> {
    mode: Mode<P>,
    inbox: Vec<MeshEvent, MESH_BUFFER_SLOTS>,
    limit: usize,
}

pub struct Mesh<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<P: Platform> MeshState<P> {
    pub(crate) fn new(settings: &ShimSettings) -> Self {
        Self {
            mode: Mode::Buffered,
            inbox: Vec::new(),
            limit: settings.mesh_buffer_slots.min(MESH_BUFFER_SLOTS),
        }
    }
}

impl<'a, P: Platform> Mesh<'a, P> {
    /// Start buffering incoming mesh messages. Has no effect on the mode
    /// once a handler is set.
    pub fn listen(&mut self) -> Result<(), Error> {
        self.register()
    }

    /// Hand every incoming mesh message to `handler`, replacing any earlier
    /// handler.
    pub fn set_incoming_handler(&mut self, handler: MeshHandler<P>) -> Result<(), Error> {
        self.register()?;
        self.app.mesh.mode = Mode::Push(handler);
        Ok(())
    }

    /// Number of buffered messages.
    pub fn available(&self) -> usize {
        self.app.mesh.inbox.len()
    }

    /// Take the most recently received buffered message.
    pub fn read_mesh_msg(&mut self) -> Option<MeshEvent> {
        self.app.mesh.inbox.pop()
    }

    /// Send `data` to `stone_id`, or to every Crownstone if `None`.
    pub fn send_mesh_msg(&mut self, data: &[u8], stone_id: Option<u8>) -> Result<(), Error> {
        let data = Vec::from_slice(data).map_err(|_| Error::PayloadTooLarge { len: data.len() })?;
        self.app
            .request(SdkType::Mesh, &MeshCommand::Send { stone_id, data })
            .map(|_| ())
    }

    /// This Crownstone's own id in the mesh.
    pub fn stone_id(&mut self) -> Result<u8, Error> {
        match self.app.request(SdkType::Mesh, &MeshCommand::StoneId(0))? {
            MeshCommand::StoneId(id) => Ok(id),
            MeshCommand::Send { .. } => Err(Error::Decode),
        }
    }

    fn register(&mut self) -> Result<(), Error> {
        self.app
            .register_interrupt(Registration::persistent(KEY, on_message::<P>, 0))
            .map(|_| ())
    }
}

fn on_message<P: Platform>(app: &mut Microapp<P>, _: usize, body: &[u8]) -> Ack {
    let event = match sdk::decode_body::<MeshEvent>(body) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "malformed mesh message");
            return Ack::ErrUndefined;
        }
    };

    match app.mesh.mode {
        Mode::Push(handler) => {
            handler(app, &event);
            Ack::Success
        }
        Mode::Buffered => {
            let state = &mut app.mesh;
            // Full: drop the new message, keep what is already buffered.
            if state.inbox.len() >= state.limit {
                tracing::warn!(stone_id = event.stone_id, "mesh buffer full, dropping message");
                return Ack::ErrNoSpace;
            }
            match state.inbox.push(event) {
                Ok(()) => Ack::Success,
                Err(_) => Ack::ErrNoSpace,
            }
        }
    }
}
