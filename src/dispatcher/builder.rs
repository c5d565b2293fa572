//! Dispatcher builder.

use super::global;
use super::scoped::ScopedDispatcher;
use super::task_dispatcher::{DispatcherKind, TaskDispatcher};
use crate::config::{env, DispatcherConfig, LeakResponse};
use crate::context::ThreadContexts;
use crate::error::Result;
use crate::types::{BuildError, BuildResult};

/// Builder for scoped and global dispatchers.
///
/// Values set here win over environment variables, which win over a config
/// file, which wins over [`DispatcherConfig::default()`].
#[derive(Debug, Default)]
#[must_use]
pub struct DispatcherBuilder {
    name: Option<String>,
    track_promise_backtraces: Option<bool>,
    leak_response: Option<LeakResponse>,
    contexts: Option<ThreadContexts>,
    env_overrides: bool,
    #[cfg(feature = "config-file")]
    config_file: Option<std::path::PathBuf>,
}

impl DispatcherBuilder {
    /// Creates a builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatcher name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Captures a backtrace for every promise the dispatcher tracks.
    pub fn track_promise_backtraces(mut self, enabled: bool) -> Self {
        self.track_promise_backtraces = Some(enabled);
        self
    }

    /// Sets what teardown does with pending promises.
    pub fn leak_response(mut self, response: LeakResponse) -> Self {
        self.leak_response = Some(response);
        self
    }

    /// Sets the executors behind the lanes. Required.
    pub fn contexts(mut self, contexts: ThreadContexts) -> Self {
        self.contexts = Some(contexts);
        self
    }

    /// Reads `LANESYNC_*` environment variables at build time.
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Reads the `[dispatcher]` section of a TOML file at build time.
    #[cfg(feature = "config-file")]
    pub fn config_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    fn resolve(self) -> BuildResult<(DispatcherConfig, ThreadContexts)> {
        let mut config = DispatcherConfig::default();

        #[cfg(feature = "config-file")]
        if let Some(path) = &self.config_file {
            let toml = env::parse_toml_file(path)?;
            let mut unused_worker = crate::config::WorkerPoolConfig::default();
            env::apply_toml_config(&mut config, &mut unused_worker, &toml)?;
        }
        if self.env_overrides {
            env::apply_dispatcher_env_overrides(&mut config)?;
        }

        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(enabled) = self.track_promise_backtraces {
            config.track_promise_backtraces = enabled;
        }
        if let Some(response) = self.leak_response {
            config.leak_response = response;
        }
        config.normalize();

        let contexts = self
            .contexts
            .ok_or_else(|| BuildError::missing_required("contexts"))?;
        Ok((config, contexts))
    }

    /// Builds a dispatcher owned by the returned value.
    pub fn build_scoped(self) -> Result<ScopedDispatcher> {
        let (config, contexts) = self.resolve()?;
        let dispatcher = TaskDispatcher::create(config, DispatcherKind::Scoped, contexts);
        Ok(ScopedDispatcher::new(dispatcher))
    }

    /// Builds and installs the process-wide dispatcher.
    ///
    /// Replaces a fallback global; fails with
    /// [`ErrorKind::GlobalAlreadyInstalled`](crate::error::ErrorKind::GlobalAlreadyInstalled)
    /// if one was installed explicitly.
    pub fn install_global(self) -> Result<TaskDispatcher> {
        let (config, contexts) = self.resolve()?;
        global::install(config, contexts)
    }
}
