use abi::sdk::{SdkType, YieldCommand};

use crate::{Error, Microapp, Platform};

impl<P: Platform> Microapp<P> {
    /// Give control back to the host firmware for `ms` milliseconds.
    ///
    /// The host decides when to resume the microapp; this does not spin.
    pub fn delay(&mut self, ms: u32) -> Result<(), Error> {
        tracing::trace!(ms, "yielding");
        self.request(SdkType::Yield, &YieldCommand { delay_ms: ms })
            .map(|_| ())
    }
}
