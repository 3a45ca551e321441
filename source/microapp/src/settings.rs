//! Sizing of the microapp's fixed tables and buffers.
//!
//! Storage for every table is reserved at compile time with the `MAX_*`
//! capacities below. [`ShimSettings`] can only lower the limits at run time,
//! values above the compile-time capacity are clamped.

use serde::{Deserialize, Serialize};

/// Capacity of the core interrupt table.
pub const MAX_INTERRUPTS: usize = 16;

/// Capacity of the BLE soft-interrupt context table.
pub const MAX_BLE_INTERRUPTS: usize = 4;

/// Capacity of the bluenet event subscription table.
pub const MAX_SUBSCRIPTIONS: usize = 4;

/// Capacity of the pin interrupt table.
pub const MAX_PIN_INTERRUPTS: usize = 4;

/// Capacity of the buffered mesh message store.
pub const MESH_BUFFER_SLOTS: usize = 3;

/// Capacity of the buffered incoming message byte stream.
pub const MESSAGE_BUFFER_BYTES: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShimSettings {
    pub max_interrupts: usize,
    pub max_ble_interrupts: usize,
    pub max_subscriptions: usize,
    pub max_pin_interrupts: usize,
    pub mesh_buffer_slots: usize,
    pub message_buffer_bytes: usize,
}

impl ShimSettings {
    pub const DEFAULT: Self = Self {
        max_interrupts: MAX_INTERRUPTS,
        max_ble_interrupts: MAX_BLE_INTERRUPTS,
        max_subscriptions: MAX_SUBSCRIPTIONS,
        max_pin_interrupts: MAX_PIN_INTERRUPTS,
        mesh_buffer_slots: MESH_BUFFER_SLOTS,
        message_buffer_bytes: MESSAGE_BUFFER_BYTES,
    };
}

impl Default for ShimSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}
