//! Power measurement and presence.

use serde::{Deserialize, Serialize};

/// Body of an [`SdkType::PowerUsage`](super::SdkType::PowerUsage) message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct PowerUsageCommand {
    /// Filled in by the response.
    pub milliwatts: i32,
}

/// Body of an [`SdkType::Presence`](super::SdkType::Presence) message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct PresenceCommand {
    pub profile: u8,
    /// Filled in by the response: bit N set means present in location N.
    pub locations: u64,
}
