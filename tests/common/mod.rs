#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! #[macro_use]
//! mod common;
//! use common::*;
//! ```

use lanesync::config::WorkerPoolConfig;
use lanesync::context::{PumpQueue, ThreadContexts, WorkerPool};
use lanesync::dispatcher::{DispatcherBuilder, ScopedDispatcher};
use lanesync::LeakResponse;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "LANESYNC_PROPTEST_SEED";

/// Upper bound for any wait in the integration suite.
pub const WAIT: Duration = Duration::from_secs(5);

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor an existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    std::env::var("CI").is_ok().then_some(DEFAULT_PROPTEST_SEED)
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Primary/secondary pumps plus a worker pool, driven by the test.
pub struct Lanes {
    pub primary: Arc<PumpQueue>,
    pub secondary: Arc<PumpQueue>,
    pub pool: WorkerPool,
}

impl Lanes {
    pub fn new() -> Self {
        Self {
            primary: Arc::new(PumpQueue::new("primary")),
            secondary: Arc::new(PumpQueue::new("secondary")),
            pool: WorkerPool::new(WorkerPoolConfig {
                thread_name_prefix: "it-worker".to_string(),
                ..WorkerPoolConfig::with_threads(1, 4)
            }),
        }
    }

    pub fn contexts(&self) -> ThreadContexts {
        ThreadContexts::new(
            self.primary.clone(),
            self.secondary.clone(),
            Arc::new(self.pool.handle()),
        )
    }

    /// A scoped dispatcher over these lanes that logs leaks.
    pub fn dispatcher(&self, name: &str) -> ScopedDispatcher {
        self.builder(name).build_scoped().expect("build dispatcher")
    }

    pub fn builder(&self, name: &str) -> DispatcherBuilder {
        DispatcherBuilder::new()
            .name(name)
            .leak_response(LeakResponse::Log)
            .contexts(self.contexts())
    }

    /// Pumps both queues until `done` holds; panics after [`WAIT`].
    pub fn pump_until(&self, what: &str, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + WAIT;
        loop {
            self.primary.pump_all();
            self.secondary.pump_all();
            if done() {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Polls `done` until it holds; panics after [`WAIT`].
pub fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Log a test phase transition with a visual separator.
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
