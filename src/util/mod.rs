//! Internal utilities for lanesync.

pub mod slots;

pub use slots::{SlotKey, SlotTable};
