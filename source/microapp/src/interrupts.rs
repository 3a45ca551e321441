//! Soft interrupt registrations and dispatch.
//!
//! The host firmware raises an interrupt by calling the microapp's
//! interrupt entry point with an event buffer of its own. That buffer starts
//! with an [`InterruptHeader`](abi::sdk::InterruptHeader) naming the
//! [`InterruptKey`] it is for, and [`Microapp::dispatch_interrupt`] runs the
//! [`Registration`] stored under that key.
//!
//! Registrations live in an [`InterruptTable`], a fixed-capacity arena
//! indexed by [`SlotId`]. The same table type backs the per-subsystem tables
//! (BLE soft-interrupt contexts, pin handlers, event subscriptions).

use core::fmt;

use abi::sdk::{self, Ack, InterruptCommand, SdkType, ACK_OFFSET};

use crate::{Error, Microapp, Platform};

/// Index of an occupied slot in an [`InterruptTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotId(usize);

/// A fixed-capacity table of keyed entries.
///
/// Storage for `N` entries is always reserved; `limit` (at most `N`) is how
/// many of them may be used.
pub struct InterruptTable<K, T, const N: usize> {
    slots: [Slot<K, T>; N],
    limit: usize,
}

enum Slot<K, T> {
    Empty,
    Occupied { key: K, value: T },
}

/// The host-side identity of an interrupt: a command family and a minor id
/// within it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterruptKey {
    pub sdk_type: SdkType,
    pub id: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// Stays registered until removed.
    Persistent,
    /// Removed right before its first dispatch.
    OneShot,
}

/// Called with the registration's context and the event body.
///
/// The returned ack is written back into the event buffer for the host.
pub type Handler<P> = fn(&mut Microapp<P>, usize, &[u8]) -> Ack;

pub struct Registration<P: Platform> {
    pub key: InterruptKey,
    pub handler: Handler<P>,
    pub context: usize,
    pub lifetime: Lifetime,
}

// === impl SlotId ===

impl SlotId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

// === impl InterruptTable ===

impl<K, T, const N: usize> InterruptTable<K, T, N>
where
    K: Copy + PartialEq,
{
    pub fn new(limit: usize) -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::Empty),
            limit: limit.min(N),
        }
    }

    /// How many entries may be stored.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.slots[..self.limit]
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `value` in a fresh slot, even if `key` is already present.
    pub fn insert(&mut self, key: K, value: T) -> Result<SlotId, Error> {
        let (idx, slot) = self.slots[..self.limit]
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| matches!(slot, Slot::Empty))
            .ok_or(Error::NoSpace)?;
        *slot = Slot::Occupied { key, value };
        Ok(SlotId(idx))
    }

    /// Store `value` unless `key` is already present.
    ///
    /// Returns the slot holding `key`, and whether `value` was stored. An
    /// existing entry is left as it is.
    pub fn insert_unique(&mut self, key: K, value: T) -> Result<(SlotId, bool), Error> {
        if let Some(id) = self.find(&key) {
            return Ok((id, false));
        }
        self.insert(key, value).map(|id| (id, true))
    }

    /// The first slot holding `key`.
    pub fn find(&self, key: &K) -> Option<SlotId> {
        self.iter().find(|(_, k, _)| *k == key).map(|(id, _, _)| id)
    }

    /// Every slot holding `key`, in slot order.
    pub fn ids_for(&self, key: &K) -> heapless::Vec<SlotId, N> {
        self.iter()
            .filter(|(_, k, _)| *k == key)
            .map(|(id, _, _)| id)
            .collect()
    }

    pub fn key(&self, id: SlotId) -> Option<K> {
        match self.slots.get(id.0)? {
            Slot::Occupied { key, .. } => Some(*key),
            Slot::Empty => None,
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty => None,
        }
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        match core::mem::replace(slot, Slot::Empty) {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &K, &T)> + '_ {
        self.slots[..self.limit]
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Slot::Occupied { key, value } => Some((SlotId(idx), key, value)),
                Slot::Empty => None,
            })
    }
}

impl<K, T, const N: usize> fmt::Debug for InterruptTable<K, T, N>
where
    K: Copy + PartialEq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(id, key, _)| (id.0, key)))
            .finish()
    }
}

// === impl InterruptKey ===

impl InterruptKey {
    pub const fn new(sdk_type: SdkType, id: u8) -> Self {
        Self { sdk_type, id }
    }
}

// === impl Registration ===

impl<P: Platform> Registration<P> {
    pub fn persistent(key: InterruptKey, handler: Handler<P>, context: usize) -> Self {
        Self {
            key,
            handler,
            context,
            lifetime: Lifetime::Persistent,
        }
    }
}

// fn pointers are always Copy, whatever `P` is.
impl<P: Platform> Clone for Registration<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Platform> Copy for Registration<P> {}

impl<P: Platform> fmt::Debug for Registration<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("context", &self.context)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

// === impl Microapp ===

impl<P: Platform> Microapp<P> {
    /// Register a soft interrupt handler and announce it to the host.
    ///
    /// Registering a key that is already registered succeeds without
    /// changing anything. If the table is full this fails with
    /// [`Error::NoSpace`]; if the host refuses the registration, the slot is
    /// released again and the host's error is returned.
    pub fn register_interrupt(&mut self, registration: Registration<P>) -> Result<SlotId, Error> {
        let key = registration.key;
        let (id, inserted) = self
            .interrupts
            .insert_unique(key, registration)
            .map_err(|error| {
                tracing::warn!(?key, "interrupt table full");
                error
            })?;
        if !inserted {
            tracing::trace!(?key, "interrupt already registered");
            return Ok(id);
        }

        let entry = self.platform.interrupt_entry();
        let command = InterruptCommand::register(key.sdk_type, key.id, entry);
        if let Err(error) = self.request(SdkType::Interrupt, &command) {
            tracing::warn!(?key, %error, "host refused interrupt registration");
            self.interrupts.remove(id);
            return Err(error);
        }

        tracing::debug!(?key, slot = id.0, "registered interrupt");
        Ok(id)
    }

    /// Whether a handler is registered for `key`.
    pub fn is_registered(&self, key: InterruptKey) -> bool {
        self.interrupts.find(&key).is_some()
    }

    /// Number of registered interrupts.
    pub fn registered_interrupts(&self) -> usize {
        self.interrupts.len()
    }

    /// Run the handler registered for the interrupt in `event`.
    ///
    /// `event` is the host's interrupt buffer, never the outgoing message, so
    /// handlers may send requests of their own. The result is also written
    /// into the buffer's ack byte.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn dispatch_interrupt(&mut self, event: &mut [u8]) -> Ack {
        let ack = self.run_interrupt(event);
        if let Some(byte) = event.get_mut(ACK_OFFSET) {
            *byte = ack.into();
        }
        ack
    }

    fn run_interrupt(&mut self, event: &[u8]) -> Ack {
        let (header, body) = match sdk::split_event(event) {
            Ok(split) => split,
            Err(error) => {
                tracing::warn!(%error, "malformed interrupt header");
                return Ack::ErrUndefined;
            }
        };

        let key = InterruptKey::new(header.sdk_type, header.id);
        let Some(id) = self.interrupts.find(&key) else {
            tracing::debug!(?key, "no handler for interrupt");
            return Ack::ErrNotFound;
        };
        let Some(registration) = self.interrupts.get(id).copied() else {
            return Ack::ErrNotFound;
        };
        if registration.lifetime == Lifetime::OneShot {
            self.interrupts.remove(id);
        }

        tracing::trace!(?key, "dispatching interrupt");
        (registration.handler)(self, registration.context, body)
    }
}
