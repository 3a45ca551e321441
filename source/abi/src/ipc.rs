//! IPC RAM: the fixed block of memory the microapp and the host firmware use
//! to find each other.
//!
//! The block survives across the two independently linked binaries, so it is
//! the only way to exchange entry point addresses at boot. Each side writes
//! its own item exactly once and reads the other side's item on first use.
//!
//! ## WARNING!
//!
//! [`IpcRamData`] is `#[repr(C)]` and its layout is shared with the host
//! firmware. Only [`IPC_PROTOCOL_VERSION`] `0` records are ever accepted; a
//! reader MUST reject any other version rather than guess at a layout.

use core::{fmt, mem::size_of};

/// The only record layout either side understands.
pub const IPC_PROTOCOL_VERSION: u8 = 0;

/// Bytes of payload per IPC item.
pub const IPC_ITEM_SIZE: usize = 24;

/// Number of items in the IPC RAM block. Item 0 is reserved.
pub const IPC_ITEM_COUNT: usize = 5;

const WORD: usize = size_of::<usize>();

// Seed so that zeroed RAM never passes the checksum.
const CHECKSUM_SEED: u16 = 0xA5A5;

wire_enum! {
    /// Well known IPC item slots.
    pub enum IpcIndex {
        /// Written by the host firmware: its callback entry point.
        CrownstoneApp = 1,
        BootloaderVersion = 2,
        /// Written by the microapp: its `setup` and `loop` entry points.
        Microapp = 3,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum IpcError {
    /// The data does not fit, either in an IPC item or in the given buffer.
    TooLarge,
    /// Nothing was ever written to this item.
    NotSet,
    /// The stored checksum does not match the stored data.
    Checksum,
    /// The record was written with a layout this side does not understand.
    UnsupportedVersion(u8),
    /// The record is shorter than its layout requires.
    Truncated,
}

/// Access to an IPC RAM block.
pub trait IpcRam {
    /// Copy the item at `index` into `out`, returning the number of bytes
    /// written.
    fn get(&self, index: IpcIndex, out: &mut [u8]) -> Result<usize, IpcError>;

    /// Replace the item at `index` with `data`.
    fn set(&mut self, index: IpcIndex, data: &[u8]) -> Result<(), IpcError>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
struct IpcItem {
    index: u8,
    size: u8,
    checksum: u16,
    data: [u8; IPC_ITEM_SIZE],
}

/// The IPC RAM block itself.
///
/// On target this lives at a fixed address provided by the linker script;
/// in tests it is an ordinary value.
#[repr(C)]
#[derive(Debug)]
pub struct IpcRamData {
    items: [IpcItem; IPC_ITEM_COUNT],
}

/// An IPC record: a protocol version byte followed by `N` little-endian
/// machine words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IpcRecord<const N: usize> {
    pub addresses: [usize; N],
}

/// Published by the microapp: `[setup, loop]`.
pub type MicroappRecord = IpcRecord<2>;

/// Published by the host firmware: `[callback]`.
pub type HostRecord = IpcRecord<1>;

// === impl IpcItem ===

impl IpcItem {
    const EMPTY: Self = Self {
        index: 0,
        size: 0,
        checksum: 0,
        data: [0; IPC_ITEM_SIZE],
    };

    fn checksum(index: u8, data: &[u8]) -> u16 {
        let init = CHECKSUM_SEED
            .wrapping_add(u16::from(index))
            .wrapping_add((data.len() as u16) << 8);
        data.iter()
            .fold(init, |acc, b| acc.rotate_left(1).wrapping_add(u16::from(*b)))
    }
}

// === impl IpcRamData ===

impl IpcRamData {
    pub const fn new() -> Self {
        Self {
            items: [IpcItem::EMPTY; IPC_ITEM_COUNT],
        }
    }

    /// Forget the item at `index`.
    pub fn clear(&mut self, index: IpcIndex) {
        self.items[usize::from(u8::from(index))] = IpcItem::EMPTY;
    }

    fn item(&self, index: IpcIndex) -> &IpcItem {
        &self.items[usize::from(u8::from(index))]
    }

    fn item_mut(&mut self, index: IpcIndex) -> &mut IpcItem {
        &mut self.items[usize::from(u8::from(index))]
    }
}

impl Default for IpcRamData {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcRam for IpcRamData {
    fn get(&self, index: IpcIndex, out: &mut [u8]) -> Result<usize, IpcError> {
        let item = self.item(index);
        if item.index != u8::from(index) {
            return Err(IpcError::NotSet);
        }

        let data = item
            .data
            .get(..usize::from(item.size))
            .ok_or(IpcError::Checksum)?;
        if IpcItem::checksum(item.index, data) != item.checksum {
            return Err(IpcError::Checksum);
        }

        let out = out.get_mut(..data.len()).ok_or(IpcError::TooLarge)?;
        out.copy_from_slice(data);
        Ok(data.len())
    }

    fn set(&mut self, index: IpcIndex, data: &[u8]) -> Result<(), IpcError> {
        if data.len() > IPC_ITEM_SIZE {
            return Err(IpcError::TooLarge);
        }

        let item = self.item_mut(index);
        item.data = [0; IPC_ITEM_SIZE];
        item.data[..data.len()].copy_from_slice(data);
        item.size = data.len() as u8;
        item.index = u8::from(index);
        item.checksum = IpcItem::checksum(item.index, data);
        Ok(())
    }
}

// === impl IpcRecord ===

impl<const N: usize> IpcRecord<N> {
    pub const ENCODED_LEN: usize = 1 + N * WORD;

    pub const fn new(addresses: [usize; N]) -> Self {
        Self { addresses }
    }

    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, IpcError> {
        let out = buf.get_mut(..Self::ENCODED_LEN).ok_or(IpcError::TooLarge)?;
        let (version, words) = out.split_at_mut(1);
        version[0] = IPC_PROTOCOL_VERSION;
        for (chunk, addr) in words.chunks_exact_mut(WORD).zip(self.addresses.iter()) {
            chunk.copy_from_slice(&addr.to_le_bytes());
        }
        Ok(Self::ENCODED_LEN)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IpcError> {
        let version = *bytes.first().ok_or(IpcError::Truncated)?;
        if version != IPC_PROTOCOL_VERSION {
            return Err(IpcError::UnsupportedVersion(version));
        }

        let words = bytes.get(1..Self::ENCODED_LEN).ok_or(IpcError::Truncated)?;
        let mut addresses = [0usize; N];
        for (addr, chunk) in addresses.iter_mut().zip(words.chunks_exact(WORD)) {
            let mut raw = [0u8; WORD];
            raw.copy_from_slice(chunk);
            *addr = usize::from_le_bytes(raw);
        }
        Ok(Self { addresses })
    }

    /// Encode this record and store it in `ram` at `index`.
    pub fn publish(&self, ram: &mut impl IpcRam, index: IpcIndex) -> Result<(), IpcError> {
        let mut buf = [0u8; IPC_ITEM_SIZE];
        let used = self.encode_into(&mut buf)?;
        ram.set(index, &buf[..used])
    }

    /// Read and decode the record stored in `ram` at `index`.
    pub fn read(ram: &impl IpcRam, index: IpcIndex) -> Result<Self, IpcError> {
        let mut buf = [0u8; IPC_ITEM_SIZE];
        let used = ram.get(index, &mut buf)?;
        Self::decode(&buf[..used])
    }
}

impl IpcRecord<2> {
    pub const fn entry_points(setup: usize, loop_entry: usize) -> Self {
        Self::new([setup, loop_entry])
    }

    pub fn setup(&self) -> usize {
        self.addresses[0]
    }

    pub fn loop_entry(&self) -> usize {
        self.addresses[1]
    }
}

impl IpcRecord<1> {
    pub const fn callback_at(callback: usize) -> Self {
        Self::new([callback])
    }

    pub fn callback(&self) -> usize {
        self.addresses[0]
    }
}

// === impl IpcError ===

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge => f.write_str("IPC data does not fit"),
            Self::NotSet => f.write_str("IPC item was never written"),
            Self::Checksum => f.write_str("IPC item checksum mismatch"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported IPC protocol version {v}"),
            Self::Truncated => f.write_str("IPC record is truncated"),
        }
    }
}
