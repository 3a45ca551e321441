//! The Crownstone's own switch.

use abi::sdk::{
    switch::{SwitchCommand, SwitchOp, SWITCH_OFF, SWITCH_ON},
    SdkType,
};

use crate::{Error, Microapp, Platform};

/// Every call returns the switch value the host reports afterwards.
pub struct Switch<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<'a, P: Platform> Switch<'a, P> {
    pub fn turn_on(&mut self) -> Result<u8, Error> {
        self.set_value(SWITCH_ON)
    }

    pub fn turn_off(&mut self) -> Result<u8, Error> {
        self.set_value(SWITCH_OFF)
    }

    pub fn toggle(&mut self) -> Result<u8, Error> {
        self.command(SwitchOp::Toggle, 0)
    }

    /// Set the switch to `value`, from [`SWITCH_OFF`] to [`SWITCH_ON`].
    /// Values in between dim.
    pub fn set_value(&mut self, value: u8) -> Result<u8, Error> {
        if value > SWITCH_ON {
            return Err(Error::InvalidArgument);
        }
        self.command(SwitchOp::Set, value)
    }

    pub fn value(&mut self) -> Result<u8, Error> {
        self.command(SwitchOp::Get, 0)
    }

    fn command(&mut self, op: SwitchOp, value: u8) -> Result<u8, Error> {
        self.app
            .request(SdkType::Switch, &SwitchCommand { op, value })
            .map(|response| response.value)
    }
}
