//! The boot handshake.
//!
//! The microapp and the host firmware are linked separately, so neither can
//! call the other by name. Instead each publishes the addresses of its entry
//! points in its own IPC RAM item: the microapp its `setup` and `loop`, the
//! host its message callback. Turning a published address back into a
//! function is the one unsafe step of the protocol, and only
//! [`Platform::invoke`](crate::Platform::invoke) does it.

use abi::ipc::{HostRecord, IpcError, IpcIndex, IpcRam, MicroappRecord};

use crate::{Error, Microapp, Platform};

/// Publish the microapp's entry points for the host firmware to find.
pub fn publish_entry_points(
    ram: &mut impl IpcRam,
    setup: usize,
    loop_entry: usize,
) -> Result<(), IpcError> {
    MicroappRecord::entry_points(setup, loop_entry).publish(ram, IpcIndex::Microapp)
}

/// Look up the host firmware's callback address.
///
/// Records of any protocol version other than 0, and a null address, are
/// treated as absent.
pub fn host_callback(ram: &impl IpcRam) -> Result<usize, IpcError> {
    let record = HostRecord::read(ram, IpcIndex::CrownstoneApp)?;
    match record.callback() {
        0 => Err(IpcError::NotSet),
        callback => Ok(callback),
    }
}

impl<P: Platform> Microapp<P> {
    /// Publish the entry points. Must run before the host firmware can call
    /// `setup`.
    ///
    /// There is nobody to report a failure to at this point: if publishing
    /// fails the host never finds the microapp, and the error is only
    /// returned here.
    pub fn boot(&mut self, setup: usize, loop_entry: usize) -> Result<(), Error> {
        match publish_entry_points(self.platform.ipc_mut(), setup, loop_entry) {
            Ok(()) => {
                tracing::debug!(setup, loop_entry, "published entry points");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "failed to publish entry points");
                Err(error.into())
            }
        }
    }
}
