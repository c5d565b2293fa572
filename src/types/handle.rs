//! Weak dispatcher handles.

use crate::util::SlotKey;
use core::fmt;

/// A weak, copyable reference to a registered dispatcher.
///
/// The handle names a registry slot and the generation of the dispatcher
/// that occupied it. Once that dispatcher is torn down the handle stops
/// resolving, even if the slot is later reused.
///
/// Invariant: `slot_index == -1` exactly when `generation == -1` (the null
/// handle).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatcherHandle {
    slot_index: i32,
    generation: i32,
}

impl DispatcherHandle {
    /// The handle that never resolves.
    pub const NULL: Self = Self {
        slot_index: -1,
        generation: -1,
    };

    /// Creates a handle from raw parts (primarily for testing).
    ///
    /// A negative value on either side yields [`DispatcherHandle::NULL`].
    #[must_use]
    pub const fn new(slot_index: i32, generation: i32) -> Self {
        if slot_index < 0 || generation < 0 {
            Self::NULL
        } else {
            Self {
                slot_index,
                generation,
            }
        }
    }

    /// Returns the registry slot index, `-1` for null.
    #[must_use]
    pub const fn slot_index(self) -> i32 {
        self.slot_index
    }

    /// Returns the generation, `-1` for null.
    #[must_use]
    pub const fn generation(self) -> i32 {
        self.generation
    }

    /// Returns true for the null handle.
    #[must_use]
    pub const fn is_null(self) -> bool {
        debug_assert!((self.slot_index == -1) == (self.generation == -1));
        self.slot_index == -1
    }

    pub(crate) const fn from_key(key: SlotKey) -> Self {
        Self::new(key.index(), key.generation())
    }

    pub(crate) const fn key(self) -> SlotKey {
        SlotKey::new(self.slot_index, self.generation)
    }
}

impl Default for DispatcherHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("DispatcherHandle(null)")
        } else {
            write!(f, "DispatcherHandle({}:{})", self.slot_index, self.generation)
        }
    }
}
