//! Test utilities for lanesync.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - [`TestContexts`]: two pump queues and a small worker pool
//! - A lock for tests that mutate environment variables
//!
//! # Example
//! ```ignore
//! use lanesync::test_utils::{init_test_logging, TestContexts};
//!
//! init_test_logging();
//! let contexts = TestContexts::new();
//! let dispatcher = contexts.scoped("under-test");
//! ```

use crate::config::WorkerPoolConfig;
use crate::context::{PumpQueue, ThreadContexts, WorkerPool};
use crate::dispatcher::{DispatcherBuilder, ScopedDispatcher};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock()
}

/// Executors for the three lanes, with handles to drive them from a test.
pub struct TestContexts {
    /// Primary lane queue; call `pump`/`pump_all` to run it.
    pub primary: Arc<PumpQueue>,
    /// Secondary lane queue.
    pub secondary: Arc<PumpQueue>,
    /// Worker lane pool.
    pub pool: WorkerPool,
}

impl TestContexts {
    /// Two pumps and a pool of up to four threads.
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: Arc::new(PumpQueue::new("test-primary")),
            secondary: Arc::new(PumpQueue::new("test-secondary")),
            pool: WorkerPool::new(WorkerPoolConfig {
                thread_name_prefix: "test-worker".to_string(),
                ..WorkerPoolConfig::with_threads(1, 4)
            }),
        }
    }

    /// The lane bundle to hand to a dispatcher.
    #[must_use]
    pub fn contexts(&self) -> ThreadContexts {
        ThreadContexts::new(
            self.primary.clone(),
            self.secondary.clone(),
            Arc::new(self.pool.handle()),
        )
    }

    /// Builds a scoped dispatcher over these contexts.
    #[must_use]
    pub fn scoped(&self, name: &str) -> ScopedDispatcher {
        DispatcherBuilder::new()
            .name(name)
            .contexts(self.contexts())
            .build_scoped()
            .expect("test dispatcher")
    }

    /// Pumps both queues until `done` holds or the timeout elapses.
    pub fn pump_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.primary.pump_all();
            self.secondary.pump_all();
            if done() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Default for TestContexts {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a test phase with visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
