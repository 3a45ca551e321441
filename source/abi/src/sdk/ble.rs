//! BLE scanning and central role.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::address::MacAddress;

/// Maximum legacy advertisement payload.
pub const MAX_ADV_DATA: usize = 31;

wire_enum! {
    /// BLE interrupt ids.
    pub enum BleEventType {
        ScanAdvertisement = 1,
        Connected = 2,
        Disconnected = 3,
        NotificationDone = 4,
    }
}

wire_enum! {
    pub enum AddressType {
        Public = 0,
        RandomStatic = 1,
        RandomPrivateResolvable = 2,
        RandomPrivateNonResolvable = 3,
    }
}

/// Body of an [`SdkType::Ble`](super::SdkType::Ble) message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum BleCommand {
    ScanStart,
    ScanStop,
    Connect { address: MacAddress },
    Disconnect { handle: u16 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub address: MacAddress,
    pub address_type: AddressType,
    pub rssi: i8,
    pub channel: u8,
    pub data: Vec<u8, MAX_ADV_DATA>,
}

/// Body of a BLE interrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BleEvent {
    Scan(ScanEvent),
    Connected { address: MacAddress, handle: u16 },
    Disconnected { handle: u16 },
    NotificationDone { handle: u16 },
}

// === impl BleEvent ===

impl BleEvent {
    pub fn event_type(&self) -> BleEventType {
        match self {
            Self::Scan(_) => BleEventType::ScanAdvertisement,
            Self::Connected { .. } => BleEventType::Connected,
            Self::Disconnected { .. } => BleEventType::Disconnected,
            Self::NotificationDone { .. } => BleEventType::NotificationDone,
        }
    }
}

// === impl ScanEvent ===

impl ScanEvent {
    /// Iterate over the `(ad_type, data)` structures of the advertisement.
    ///
    /// Iteration stops at the first malformed length byte.
    pub fn ad_structures(&self) -> AdStructures<'_> {
        AdStructures { rest: &self.data }
    }

    /// The data of the first AD structure of the given type.
    pub fn find_ad(&self, ad_type: u8) -> Option<&[u8]> {
        self.ad_structures()
            .find(|(ty, _)| *ty == ad_type)
            .map(|(_, data)| data)
    }

    /// The complete or shortened local name, if advertised.
    pub fn local_name(&self) -> Option<&str> {
        const SHORTENED_LOCAL_NAME: u8 = 0x08;
        const COMPLETE_LOCAL_NAME: u8 = 0x09;
        let name = self
            .find_ad(COMPLETE_LOCAL_NAME)
            .or_else(|| self.find_ad(SHORTENED_LOCAL_NAME))?;
        core::str::from_utf8(name).ok()
    }
}

pub struct AdStructures<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.rest.split_first()?;
        let len = usize::from(len);
        if len == 0 || rest.len() < len {
            self.rest = &[];
            return None;
        }
        let (field, rest) = rest.split_at(len);
        self.rest = rest;
        let (&ty, data) = field.split_first()?;
        Some((ty, data))
    }
}
