//! Crownstone mesh messages.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum payload of one mesh message.
pub const MAX_MESH_DATA: usize = 32;

wire_enum! {
    /// Mesh interrupt ids.
    pub enum MeshEventType {
        Received = 1,
    }
}

/// Body of an [`SdkType::Mesh`](super::SdkType::Mesh) message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshCommand {
    /// Send to one Crownstone, or broadcast when `stone_id` is `None`.
    Send {
        stone_id: Option<u8>,
        data: Vec<u8, MAX_MESH_DATA>,
    },
    /// The response carries this Crownstone's own id.
    StoneId(u8),
}

/// Body of a [`MeshEventType::Received`] interrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshEvent {
    pub stone_id: u8,
    pub data: Vec<u8, MAX_MESH_DATA>,
}
