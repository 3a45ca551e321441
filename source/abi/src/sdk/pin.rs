//! GPIO pins.

use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum PinMode {
        Input = 0,
        InputPullup = 1,
        InputPulldown = 2,
        Output = 3,
    }
}

wire_enum! {
    /// Which transitions raise a pin interrupt.
    pub enum Edge {
        Rising = 1,
        Falling = 2,
        Change = 3,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum PinOp {
    Init { mode: PinMode },
    Write { high: bool },
    /// `high` is ignored in the request and filled in by the response.
    Read { high: bool },
    /// Start raising pin interrupts on `edge`. Registration of the interrupt
    /// itself goes through [`InterruptCommand`](super::InterruptCommand).
    Interrupt { edge: Edge },
}

/// Body of an [`SdkType::Pin`](super::SdkType::Pin) message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct PinCommand {
    pub pin: u8,
    pub op: PinOp,
}

/// Body of a pin interrupt. The interrupt id is the pin number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct PinEvent {
    pub pin: u8,
    pub high: bool,
}
