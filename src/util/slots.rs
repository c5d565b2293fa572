//! Generation-tagged slot table.
//!
//! Backs the dispatcher registry and the per-dispatcher promise tracking
//! table. Every key carries the generation of the occupant it was issued for,
//! so a key outliving its value can never observe a later occupant of the
//! same slot.
//!
//! # Design
//!
//! - Values live in a `Vec` of slots; vacated slots go on a free list and are
//!   reused before the table grows
//! - Generations come from one table-wide counter, so a reused slot always
//!   receives a generation no earlier occupant had
//! - Generations stay inside `0..=i32::MAX`; `-1` is reserved for null keys

use core::fmt;

/// Highest generation value before the counter wraps back to zero.
const MAX_GENERATION: i32 = i32::MAX;

/// A key into a [`SlotTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    index: i32,
    generation: i32,
}

impl SlotKey {
    /// The key that never refers to a value.
    pub const NULL: Self = Self {
        index: -1,
        generation: -1,
    };

    /// Creates a key from raw parts.
    #[must_use]
    pub const fn new(index: i32, generation: i32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> i32 {
        self.index
    }

    /// Returns the generation the key was issued for.
    #[must_use]
    pub const fn generation(self) -> i32 {
        self.generation
    }

    /// Returns true for the null key.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == -1
    }

    fn slot(self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

impl Default for SlotKey {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("SlotKey(null)")
        } else {
            write!(f, "SlotKey({}:{})", self.index, self.generation)
        }
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied { value: T, generation: i32 },
    Vacant,
}

/// A slot table handing out generation-tagged keys.
#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    next_generation: i32,
    len: usize,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_generation: 0,
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no slot is occupied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots ever allocated (occupied or vacant).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn bump_generation(&mut self) -> i32 {
        let generation = self.next_generation;
        self.next_generation = if generation == MAX_GENERATION {
            0
        } else {
            generation + 1
        };
        generation
    }

    /// Inserts a value and returns its key.
    ///
    /// Vacant slots are reused before the table grows.
    ///
    /// # Panics
    ///
    /// Panics if the table would exceed `i32::MAX` slots.
    pub fn insert(&mut self, value: T) -> SlotKey {
        let generation = self.bump_generation();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Slot::Occupied { value, generation };
                slot
            }
            None => {
                self.slots.push(Slot::Occupied { value, generation });
                self.slots.len() - 1
            }
        };
        self.len += 1;
        let index = i32::try_from(slot).expect("slot table overflow");
        SlotKey { index, generation }
    }

    /// Removes the value for `key`.
    ///
    /// Returns `None` if the key is null, out of range, vacant, or stale.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = key.slot()?;
        match self.slots.get(slot)? {
            Slot::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }
        let old = core::mem::replace(&mut self.slots[slot], Slot::Vacant);
        self.free.push(slot);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant => None,
        }
    }

    /// Returns a reference to the value for `key`.
    #[must_use]
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        match self.slots.get(key.slot()?)? {
            Slot::Occupied { value, generation } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Returns true if `key` refers to a live value.
    #[must_use]
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { value, generation } => Some((
                    SlotKey {
                        index: slot as i32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Vacant => None,
            })
    }

    /// Vacates every slot and returns the removed values in slot order.
    ///
    /// Every previously issued key becomes stale.
    pub fn drain(&mut self) -> Vec<(SlotKey, T)> {
        let mut drained = Vec::with_capacity(self.len);
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied { value, generation } = core::mem::replace(entry, Slot::Vacant)
            {
                drained.push((
                    SlotKey {
                        index: slot as i32,
                        generation,
                    },
                    value,
                ));
                self.free.push(slot);
            }
        }
        self.len = 0;
        drained
    }
}
