//! Environment variable and config file support.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`leak_response(..)`)
//! 2. **Environment variables**: values from `LANESYNC_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: [`DispatcherConfig::default()`] and [`WorkerPoolConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `LANESYNC_TRACK_PROMISE_BACKTRACES` | `bool` | `track_promise_backtraces` |
//! | `LANESYNC_LEAK_RESPONSE` | `panic\|log\|silent` | `leak_response` |
//! | `LANESYNC_WORKER_MIN_THREADS` | `usize` | `min_threads` |
//! | `LANESYNC_WORKER_MAX_THREADS` | `usize` | `max_threads` |
//! | `LANESYNC_WORKER_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |

use super::{DispatcherConfig, LeakResponse, WorkerPoolConfig};
use crate::types::BuildError;

/// Environment variable name for promise backtrace capture.
pub const ENV_TRACK_PROMISE_BACKTRACES: &str = "LANESYNC_TRACK_PROMISE_BACKTRACES";
/// Environment variable name for the teardown leak response.
pub const ENV_LEAK_RESPONSE: &str = "LANESYNC_LEAK_RESPONSE";
/// Environment variable name for worker pool minimum threads.
pub const ENV_WORKER_MIN_THREADS: &str = "LANESYNC_WORKER_MIN_THREADS";
/// Environment variable name for worker pool maximum threads.
pub const ENV_WORKER_MAX_THREADS: &str = "LANESYNC_WORKER_MAX_THREADS";
/// Environment variable name for worker thread name prefix.
pub const ENV_WORKER_THREAD_NAME_PREFIX: &str = "LANESYNC_WORKER_THREAD_NAME_PREFIX";

/// Apply environment variable overrides to a [`DispatcherConfig`].
///
/// Only variables that are set are applied. Returns an error if a variable
/// is set but contains an unparseable value.
pub fn apply_dispatcher_env_overrides(config: &mut DispatcherConfig) -> Result<(), BuildError> {
    if let Some(val) = read_env(ENV_TRACK_PROMISE_BACKTRACES) {
        config.track_promise_backtraces = parse_bool(ENV_TRACK_PROMISE_BACKTRACES, &val)?;
    }
    if let Some(val) = read_env(ENV_LEAK_RESPONSE) {
        config.leak_response = parse_leak_response(ENV_LEAK_RESPONSE, &val)?;
    }
    Ok(())
}

/// Apply environment variable overrides to a [`WorkerPoolConfig`].
///
/// Fails if the resulting thread bounds are inverted.
pub fn apply_worker_env_overrides(config: &mut WorkerPoolConfig) -> Result<(), BuildError> {
    if let Some(val) = read_env(ENV_WORKER_MIN_THREADS) {
        config.min_threads = parse_usize(ENV_WORKER_MIN_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_WORKER_MAX_THREADS) {
        config.max_threads = parse_usize(ENV_WORKER_MAX_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_WORKER_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    config.validate()
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &'static str, val: &str) -> Result<usize, BuildError> {
    val.trim().parse::<usize>().map_err(|e| {
        BuildError::invalid_value(
            var_name,
            format!("expected unsigned integer, got {val:?} ({e})"),
        )
    })
}

fn parse_bool(var_name: &'static str, val: &str) -> Result<bool, BuildError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(BuildError::invalid_value(
            var_name,
            format!("expected bool (true/false/1/0/yes/no), got {val:?}"),
        )),
    }
}

fn parse_leak_response(var_name: &'static str, val: &str) -> Result<LeakResponse, BuildError> {
    LeakResponse::parse(val).ok_or_else(|| {
        BuildError::invalid_value(var_name, format!("expected panic/log/silent, got {val:?}"))
    })
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable lanesync configuration.
///
/// ```toml
/// [dispatcher]
/// track_promise_backtraces = true
/// leak_response = "panic"
///
/// [worker]
/// min_threads = 1
/// max_threads = 8
/// thread_name_prefix = "mesher"
/// idle_timeout_ms = 5000
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct LanesyncTomlConfig {
    /// Dispatcher settings.
    #[serde(default)]
    pub dispatcher: DispatcherToml,
    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerToml,
}

/// Dispatcher section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct DispatcherToml {
    /// Dispatcher name.
    pub name: Option<String>,
    /// Capture a backtrace per tracked promise.
    pub track_promise_backtraces: Option<bool>,
    /// `panic`, `log` or `silent`.
    pub leak_response: Option<String>,
}

/// Worker pool section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct WorkerToml {
    /// Minimum number of worker threads.
    pub min_threads: Option<usize>,
    /// Maximum number of worker threads.
    pub max_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name_prefix: Option<String>,
    /// Idle retirement timeout in milliseconds.
    pub idle_timeout_ms: Option<u64>,
}

/// Apply a parsed TOML config.
///
/// Only fields that are `Some` in the TOML struct override the configs.
/// Inverted worker thread bounds are rejected.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(
    dispatcher: &mut DispatcherConfig,
    worker: &mut WorkerPoolConfig,
    toml: &LanesyncTomlConfig,
) -> Result<(), BuildError> {
    if let Some(ref v) = toml.dispatcher.name {
        dispatcher.name.clone_from(v);
    }
    if let Some(v) = toml.dispatcher.track_promise_backtraces {
        dispatcher.track_promise_backtraces = v;
    }
    if let Some(ref v) = toml.dispatcher.leak_response {
        dispatcher.leak_response = parse_leak_response("dispatcher.leak_response", v)?;
    }
    if let Some(v) = toml.worker.min_threads {
        worker.min_threads = v;
    }
    if let Some(v) = toml.worker.max_threads {
        worker.max_threads = v;
    }
    if let Some(ref v) = toml.worker.thread_name_prefix {
        worker.thread_name_prefix.clone_from(v);
    }
    if let Some(ms) = toml.worker.idle_timeout_ms {
        worker.idle_timeout = std::time::Duration::from_millis(ms);
    }
    worker.validate()
}

/// Parse a TOML string into a [`LanesyncTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<LanesyncTomlConfig, BuildError> {
    toml::from_str(toml_str)
        .map_err(|e| BuildError::custom(format!("failed to parse TOML config: {e}")))
}

/// Read and parse a TOML file into a [`LanesyncTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<LanesyncTomlConfig, BuildError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BuildError::custom(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    parse_toml_str(&content)
}
