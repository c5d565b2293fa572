//! The process-wide dispatcher.
//!
//! # Lifecycle
//!
//! 1. The host installs a global dispatcher with
//!    [`DispatcherBuilder::install_global`](super::DispatcherBuilder::install_global).
//! 2. Promises whose owner is gone, and code running outside any
//!    [`DispatcherScope`](super::DispatcherScope), use it.
//! 3. [`shutdown_global`] tears it down; [`shutdown_process`] additionally
//!    invalidates every registry slot, for module unload.
//!
//! If nothing has been installed when the global dispatcher is first needed,
//! a fallback is created. Each of its lanes is backed by a private pool; the
//! primary and secondary pools are capped at one thread so those lanes stay
//! serial. The fallback is replaced by the first explicit install.

use super::diagnostics::PromiseDump;
use super::registry::registry;
use super::task_dispatcher::{DispatcherKind, TaskDispatcher};
use crate::config::{DispatcherConfig, WorkerPoolConfig};
use crate::context::{ThreadContexts, WorkerPool};
use crate::error::{Error, ErrorKind, Result};
use crate::tracing_compat::{info, warn};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const FALLBACK_NAME: &str = "global-fallback";

static GLOBAL: RwLock<Option<GlobalSlot>> = parking_lot::const_rwlock(None);
static FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

struct GlobalSlot {
    dispatcher: TaskDispatcher,
    // Present only for the fallback; dropped after teardown.
    pools: Option<FallbackPools>,
}

struct FallbackPools {
    primary: WorkerPool,
    secondary: WorkerPool,
    worker: WorkerPool,
}

impl FallbackPools {
    fn new() -> Self {
        let serial = |lane: &str| {
            WorkerPool::new(WorkerPoolConfig {
                thread_name_prefix: format!("lanesync-{FALLBACK_NAME}-{lane}"),
                ..WorkerPoolConfig::with_threads(0, 1)
            })
        };
        Self {
            primary: serial("primary"),
            secondary: serial("secondary"),
            worker: WorkerPool::new(WorkerPoolConfig {
                min_threads: 0,
                thread_name_prefix: format!("lanesync-{FALLBACK_NAME}-worker"),
                ..WorkerPoolConfig::default()
            }),
        }
    }

    fn contexts(&self) -> ThreadContexts {
        ThreadContexts::new(
            Arc::new(self.primary.handle()),
            Arc::new(self.secondary.handle()),
            Arc::new(self.worker.handle()),
        )
    }
}

impl GlobalSlot {
    fn is_fallback(&self) -> bool {
        self.pools.is_some()
    }

    fn teardown(self) -> Vec<PromiseDump> {
        let leaked = self.dispatcher.inner().teardown();
        drop(self.pools);
        leaked
    }
}

pub(crate) fn install(config: DispatcherConfig, contexts: ThreadContexts) -> Result<TaskDispatcher> {
    let mut slot = GLOBAL.write();
    if slot.as_ref().is_some_and(|s| !s.is_fallback()) {
        return Err(Error::new(ErrorKind::GlobalAlreadyInstalled)
            .with_message(format!("cannot install {:?}", config.name)));
    }
    let dispatcher = TaskDispatcher::create(config, DispatcherKind::Global, contexts);
    let replaced = slot.replace(GlobalSlot {
        dispatcher: dispatcher.clone(),
        pools: None,
    });
    drop(slot);

    info!(dispatcher = %dispatcher.name(), "global dispatcher installed");
    if let Some(fallback) = replaced {
        let _ = fallback.teardown();
    }
    Ok(dispatcher)
}

/// Returns the global dispatcher, creating the fallback if none is installed.
#[must_use]
pub fn global() -> TaskDispatcher {
    if let Some(dispatcher) = try_global() {
        return dispatcher;
    }

    let mut slot = GLOBAL.write();
    if let Some(existing) = slot.as_ref() {
        return existing.dispatcher.clone();
    }
    let fallback = create_fallback();
    let dispatcher = fallback.dispatcher.clone();
    *slot = Some(fallback);
    drop(slot);

    if !FALLBACK_WARNED.swap(true, Ordering::Relaxed) {
        warn!("no global dispatcher installed, using a pool-backed fallback");
    }
    dispatcher
}

fn create_fallback() -> GlobalSlot {
    let pools = FallbackPools::new();
    let contexts = pools.contexts();
    let config = DispatcherConfig {
        name: FALLBACK_NAME.to_string(),
        ..DispatcherConfig::default()
    };
    GlobalSlot {
        dispatcher: TaskDispatcher::create(config, DispatcherKind::Global, contexts),
        pools: Some(pools),
    }
}

/// Returns the global dispatcher without creating a fallback.
#[must_use]
pub fn try_global() -> Option<TaskDispatcher> {
    GLOBAL.read().as_ref().map(|slot| slot.dispatcher.clone())
}

/// Returns true if a global dispatcher was explicitly installed.
#[must_use]
pub fn is_installed() -> bool {
    GLOBAL.read().as_ref().is_some_and(|slot| !slot.is_fallback())
}

/// Tears down the global dispatcher, returning its pending promises.
///
/// A later [`global`] call creates a fresh fallback.
pub fn shutdown_global() -> Vec<PromiseDump> {
    let taken = GLOBAL.write().take();
    taken.map_or_else(Vec::new, GlobalSlot::teardown)
}

/// Module-unload teardown: shuts down the global dispatcher and invalidates
/// every registry slot, so no handle issued so far resolves again.
pub fn shutdown_process() -> Vec<PromiseDump> {
    let leaked = shutdown_global();
    let vacated = registry().invalidate_all();
    info!(vacated, leaked = leaked.len(), "lanesync process shutdown");
    leaked
}
