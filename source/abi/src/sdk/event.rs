//! Bodies of host-pushed byte payloads: bluenet events and incoming
//! microapp messages.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum payload of a bluenet event.
pub const MAX_EVENT_DATA: usize = 40;

/// Maximum payload of one incoming message.
pub const MAX_MESSAGE_DATA: usize = 40;

/// Body of an [`SdkType::BluenetEvent`](super::SdkType::BluenetEvent)
/// interrupt. The interrupt id is the event type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluenetEventBody {
    pub data: Vec<u8, MAX_EVENT_DATA>,
}

/// Body of an [`SdkType::Message`](super::SdkType::Message) interrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub data: Vec<u8, MAX_MESSAGE_DATA>,
}
