//! Process-wide dispatcher registry.
//!
//! Every dispatcher claims a slot when it is constructed and releases it at
//! teardown. The registry only holds weak references, so it never extends a
//! dispatcher's lifetime; a [`DispatcherHandle`] is the only way other code
//! refers to a dispatcher without owning it.

use super::task_dispatcher::{DispatcherInner, TaskDispatcher};
use crate::error::{report_usage_error, Error, ErrorKind};
use crate::types::DispatcherHandle;
use crate::util::SlotTable;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Weak;

static REGISTRY: DispatcherRegistry = DispatcherRegistry::new();

/// Returns the process-wide registry.
#[must_use]
pub fn registry() -> &'static DispatcherRegistry {
    &REGISTRY
}

/// Slot table mapping handles to live dispatchers.
pub struct DispatcherRegistry {
    slots: Mutex<SlotTable<Weak<DispatcherInner>>>,
}

impl DispatcherRegistry {
    const fn new() -> Self {
        Self {
            slots: parking_lot::const_mutex(SlotTable::new()),
        }
    }

    pub(crate) fn register(&self, dispatcher: Weak<DispatcherInner>) -> DispatcherHandle {
        DispatcherHandle::from_key(self.slots.lock().insert(dispatcher))
    }

    /// Resolves a handle to its dispatcher.
    ///
    /// Returns `None` for the null handle, a vacated or reused slot, or a
    /// dispatcher that is being dropped.
    #[must_use]
    pub fn resolve(&self, handle: DispatcherHandle) -> Option<TaskDispatcher> {
        if handle.is_null() {
            return None;
        }
        let weak = self.slots.lock().get(handle.key()).cloned()?;
        weak.upgrade().map(TaskDispatcher::from_inner)
    }

    /// Vacates the handle's slot. Returns false, and reports a usage error,
    /// if the handle is stale.
    pub fn unregister(&self, handle: DispatcherHandle) -> bool {
        let removed = self.release(handle);
        if !removed {
            report_usage_error(
                &Error::new(ErrorKind::StaleHandle)
                    .with_message(format!("unregister of {handle:?}")),
            );
        }
        removed
    }

    /// Vacates the slot without reporting. Teardown uses this since
    /// [`invalidate_all`](Self::invalidate_all) may have run first.
    pub(crate) fn release(&self, handle: DispatcherHandle) -> bool {
        if handle.is_null() {
            return false;
        }
        // Drop the weak reference outside the lock.
        let removed = self.slots.lock().remove(handle.key());
        removed.is_some()
    }

    /// Vacates every slot so that no outstanding handle resolves again.
    ///
    /// The registry stays usable: dispatchers created afterwards register as
    /// usual. Returns the number of slots vacated.
    pub fn invalidate_all(&self) -> usize {
        let drained = self.slots.lock().drain();
        drained.len()
    }

    /// Returns true if the handle currently resolves to a slot.
    #[must_use]
    pub fn contains(&self, handle: DispatcherHandle) -> bool {
        !handle.is_null() && self.slots.lock().contains(handle.key())
    }

    /// Number of registered dispatchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DispatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherRegistry")
            .field("len", &self.len())
            .finish()
    }
}
