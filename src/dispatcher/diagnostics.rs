//! Pending-promise tracking and leak reports.
//!
//! Each dispatcher keeps a table of the promises it owns that have not been
//! settled yet. An entry keeps the promise state alive, records the value
//! type and creation time, and optionally a creation backtrace. Settlement
//! removes the entry; teardown drains whatever is left and reports it as
//! leaked.

use crate::config::LeakResponse;
use crate::tracing_compat::warn;
use crate::util::{SlotKey, SlotTable};
use parking_lot::Mutex;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot of one pending promise.
#[derive(Debug, Clone)]
pub struct PromiseDump {
    /// Name of the owning dispatcher.
    pub dispatcher: String,
    /// Rust type name of the promised value.
    pub type_name: &'static str,
    /// Time since the promise was created.
    pub age: Duration,
    /// Creation backtrace, if backtrace tracking was enabled.
    pub backtrace: Option<Arc<Backtrace>>,
}

impl fmt::Display for PromiseDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Promise<{}> pending for {:?} on dispatcher {:?}",
            self.type_name, self.age, self.dispatcher
        )?;
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\ncreated at:\n{backtrace}")?;
        }
        Ok(())
    }
}

struct TrackedPromise {
    // Only held to keep the state alive until settlement or teardown.
    _keep_alive: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    created_at: Instant,
    backtrace: Option<Arc<Backtrace>>,
}

impl TrackedPromise {
    fn dump(&self, dispatcher: &str, now: Instant) -> PromiseDump {
        PromiseDump {
            dispatcher: dispatcher.to_string(),
            type_name: self.type_name,
            age: now.saturating_duration_since(self.created_at),
            backtrace: self.backtrace.clone(),
        }
    }
}

#[derive(Default)]
struct TrackerTable {
    entries: SlotTable<TrackedPromise>,
    closed: bool,
}

/// A dispatcher's table of pending promises.
pub(crate) struct PromiseTracker {
    table: Mutex<TrackerTable>,
    count: AtomicI32,
    capture_backtraces: bool,
}

impl PromiseTracker {
    pub(crate) fn new(capture_backtraces: bool) -> Self {
        Self {
            table: Mutex::new(TrackerTable::default()),
            count: AtomicI32::new(0),
            capture_backtraces,
        }
    }

    /// Starts tracking a pending promise. Returns `None` once the tracker has
    /// been drained by teardown.
    pub(crate) fn track(
        &self,
        keep_alive: Arc<dyn Any + Send + Sync>,
        type_name: &'static str,
    ) -> Option<SlotKey> {
        let backtrace = self
            .capture_backtraces
            .then(|| Arc::new(Backtrace::force_capture()));
        let entry = TrackedPromise {
            _keep_alive: keep_alive,
            type_name,
            created_at: Instant::now(),
            backtrace,
        };

        let mut table = self.table.lock();
        if table.closed {
            return None;
        }
        let key = table.entries.insert(entry);
        self.count.fetch_add(1, Ordering::AcqRel);
        Some(key)
    }

    /// Stops tracking a settled promise.
    pub(crate) fn untrack(&self, key: SlotKey) -> bool {
        // The entry may hold the last reference to the state; drop it unlocked.
        let removed = self.table.lock().entries.remove(key);
        if removed.is_some() {
            self.count.fetch_sub(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    pub(crate) fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn dump(&self, dispatcher: &str) -> Vec<PromiseDump> {
        let now = Instant::now();
        self.table
            .lock()
            .entries
            .iter()
            .map(|(_, entry)| entry.dump(dispatcher, now))
            .collect()
    }

    /// Closes the tracker and releases every entry, returning a dump of what
    /// was still pending.
    pub(crate) fn release_all(&self, dispatcher: &str) -> Vec<PromiseDump> {
        let drained = {
            let mut table = self.table.lock();
            table.closed = true;
            table.entries.drain()
        };
        self.count.store(0, Ordering::Release);

        let now = Instant::now();
        drained
            .iter()
            .map(|(_, entry)| entry.dump(dispatcher, now))
            .collect()
    }
}

/// Applies the configured leak response to a teardown report.
pub(crate) fn report_leaks(dispatcher: &str, leaked: &[PromiseDump], response: LeakResponse) {
    if leaked.is_empty() {
        return;
    }
    match response {
        LeakResponse::Silent => {}
        LeakResponse::Log => log_leaks(dispatcher, leaked),
        LeakResponse::Panic => {
            log_leaks(dispatcher, leaked);
            if !std::thread::panicking() {
                panic!(
                    "dispatcher {dispatcher:?} torn down with {} pending promise(s)",
                    leaked.len()
                );
            }
        }
    }
}

fn log_leaks(dispatcher: &str, leaked: &[PromiseDump]) {
    warn!(
        dispatcher,
        count = leaked.len(),
        "dispatcher torn down with pending promises"
    );
    for dump in leaked {
        warn!(dispatcher, "leaked {dump}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_alive() -> Arc<dyn Any + Send + Sync> {
        Arc::new(())
    }

    #[test]
    fn track_and_untrack_adjust_count() {
        let tracker = PromiseTracker::new(false);
        let a = tracker.track(keep_alive(), "u32").unwrap();
        let b = tracker.track(keep_alive(), "String").unwrap();
        assert_eq!(tracker.count(), 2);

        assert!(tracker.untrack(a));
        assert!(!tracker.untrack(a));
        assert_eq!(tracker.count(), 1);

        let dumps = tracker.dump("unit");
        assert_eq!(dumps.len(), 1);
        assert_eq!(dumps[0].type_name, "String");
        assert!(dumps[0].backtrace.is_none());
        assert!(tracker.untrack(b));
    }

    #[test]
    fn entry_keeps_state_alive_until_untracked() {
        let tracker = PromiseTracker::new(false);
        let state: Arc<dyn Any + Send + Sync> = Arc::new(5_u8);
        let weak = Arc::downgrade(&state);
        let key = tracker.track(state, "u8").unwrap();
        assert!(weak.upgrade().is_some());
        tracker.untrack(key);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn release_all_closes_tracker() {
        let tracker = PromiseTracker::new(true);
        tracker.track(keep_alive(), "u64").unwrap();
        let leaked = tracker.release_all("unit");
        assert_eq!(leaked.len(), 1);
        assert!(leaked[0].backtrace.is_some());
        assert_eq!(tracker.count(), 0);
        assert!(tracker.track(keep_alive(), "u64").is_none());
    }

    #[test]
    #[should_panic(expected = "torn down with 1 pending promise")]
    fn panic_response_panics() {
        let tracker = PromiseTracker::new(false);
        tracker.track(keep_alive(), "u64").unwrap();
        let leaked = tracker.release_all("strict");
        report_leaks("strict", &leaked, LeakResponse::Panic);
    }

    #[test]
    fn dump_display_mentions_type() {
        let dump = PromiseDump {
            dispatcher: "meshing".into(),
            type_name: "alloc::string::String",
            age: Duration::from_millis(3),
            backtrace: None,
        };
        let text = dump.to_string();
        assert!(text.contains("Promise<alloc::string::String>"));
        assert!(text.contains("meshing"));
    }
}
