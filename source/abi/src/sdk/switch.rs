//! The Crownstone's own relay/dimmer.

use serde::{Deserialize, Serialize};

/// Switch value meaning fully off.
pub const SWITCH_OFF: u8 = 0;

/// Switch value meaning fully on. Anything in between dims.
pub const SWITCH_ON: u8 = 100;

wire_enum! {
    pub enum SwitchOp {
        Set = 0,
        Get = 1,
        Toggle = 2,
    }
}

/// Body of an [`SdkType::Switch`](super::SdkType::Switch) message.
///
/// `value` is the requested value going out, and the resulting switch state
/// coming back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SwitchCommand {
    pub op: SwitchOp,
    pub value: u8,
}
