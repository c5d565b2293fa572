//! Dispatcher and worker-pool configuration.
//!
//! These types hold the concrete values used at construction time. In most
//! cases you should use [`DispatcherBuilder`](crate::dispatcher::DispatcherBuilder)
//! rather than filling a [`DispatcherConfig`] by hand.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `DispatcherConfig::name` | `"dispatcher"` |
//! | `DispatcherConfig::track_promise_backtraces` | `false` |
//! | `DispatcherConfig::leak_response` | [`LeakResponse::Log`] |
//! | `WorkerPoolConfig::min_threads` | 1 |
//! | `WorkerPoolConfig::max_threads` | available CPU parallelism |
//! | `WorkerPoolConfig::thread_name_prefix` | `"lanesync-worker"` |
//! | `WorkerPoolConfig::idle_timeout` | 10 s |

pub mod env;

use std::time::Duration;

const DEFAULT_DISPATCHER_NAME: &str = "dispatcher";
const DEFAULT_THREAD_NAME_PREFIX: &str = "lanesync-worker";
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Response policy when a dispatcher is torn down with pending promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LeakResponse {
    /// Panic with the leak report (never while already unwinding).
    Panic,
    /// Log every leaked promise at `warn`.
    #[default]
    Log,
    /// Drop the report silently.
    Silent,
}

impl LeakResponse {
    /// Parses `panic`, `log` or `silent` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "panic" => Some(Self::Panic),
            "log" => Some(Self::Log),
            "silent" => Some(Self::Silent),
            _ => None,
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Name used in logs and promise dumps.
    pub name: String,
    /// Capture a backtrace for every tracked promise.
    pub track_promise_backtraces: bool,
    /// What teardown does with still-pending promises.
    pub leak_response: LeakResponse,
}

impl DispatcherConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.name.trim().is_empty() {
            self.name = DEFAULT_DISPATCHER_NAME.to_string();
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DISPATCHER_NAME.to_string(),
            track_promise_backtraces: false,
            leak_response: LeakResponse::default(),
        }
    }
}

/// Configuration for the default worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Threads kept alive even when idle.
    pub min_threads: usize,
    /// Upper bound on concurrently running threads.
    pub max_threads: usize,
    /// Prefix for OS thread names; a sequence number is appended.
    pub thread_name_prefix: String,
    /// How long a thread above `min_threads` may idle before retiring.
    pub idle_timeout: Duration,
}

impl WorkerPoolConfig {
    /// Creates a config with explicit thread bounds and other fields defaulted.
    #[must_use]
    pub fn with_threads(min_threads: usize, max_threads: usize) -> Self {
        Self {
            min_threads,
            max_threads,
            ..Self::default()
        }
    }

    /// Applies `LANESYNC_WORKER_*` overrides from the environment.
    pub fn with_env_overrides(mut self) -> Result<Self, crate::types::BuildError> {
        env::apply_worker_env_overrides(&mut self)?;
        Ok(self)
    }

    /// Rejects `min_threads > max_threads`.
    pub fn validate(&self) -> Result<(), crate::types::BuildError> {
        if self.min_threads > self.max_threads {
            return Err(crate::types::BuildError::invalid_range(
                "worker_threads",
                self.min_threads as u64,
                self.max_threads as u64,
            ));
        }
        Ok(())
    }

    /// Normalize configuration values to safe defaults.
    ///
    /// Programmatic configs are clamped rather than rejected: an inverted
    /// range raises `max_threads` to `min_threads`. Use
    /// [`validate`](Self::validate) to reject it instead.
    pub fn normalize(&mut self) {
        if self.max_threads == 0 {
            self.max_threads = 1;
        }
        if self.max_threads < self.min_threads {
            self.max_threads = self.min_threads;
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = DEFAULT_THREAD_NAME_PREFIX.to_string();
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
    }

    pub(crate) fn default_max_threads() -> usize {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4)
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_threads: 1,
            max_threads: Self::default_max_threads(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
