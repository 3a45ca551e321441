//! Power measurement and presence queries.

use abi::sdk::{
    power::{PowerUsageCommand, PresenceCommand},
    SdkType,
};

use crate::{Error, Microapp, Platform};

impl<P: Platform> Microapp<P> {
    /// Current power usage, in milliwatts.
    pub fn power_usage(&mut self) -> Result<i32, Error> {
        self.request(SdkType::PowerUsage, &PowerUsageCommand { milliwatts: 0 })
            .map(|response| response.milliwatts)
    }

    /// Locations where someone with `profile` is present, one bit per
    /// location.
    pub fn presence(&mut self, profile: u8) -> Result<u64, Error> {
        self.request(
            SdkType::Presence,
            &PresenceCommand {
                profile,
                locations: 0,
            },
        )
        .map(|response| response.locations)
    }
}
