//! lanesync: dispatcher-scoped promises and futures over named execution lanes.
//!
//! # Overview
//!
//! Work is dispatched onto logical lanes ([`ThreadKind`]): a primary and a
//! secondary serial context, a shared worker pool, or inline on the caller.
//! A [`TaskDispatcher`] owns the mapping from lanes to executors and runs
//! every callable inside a [`DispatcherScope`], so promises created by that
//! callable are attributed to it. Results flow between lanes through
//! [`Promise`]/[`Future`] pairs whose continuations fire in attachment order
//! on the lane each one asked for.
//!
//! # Core Guarantees
//!
//! - **Write once**: a promise settles at most once; a second `set` is a
//!   usage error
//! - **Ordered delivery**: continuations on one future fire in attachment
//!   order, each exactly once
//! - **No surprise reentrancy**: a continuation attached after settlement is
//!   dispatched, never run on the attaching stack
//! - **Weak handles**: a [`DispatcherHandle`] stops resolving once its
//!   dispatcher is torn down, even if the registry slot is reused
//! - **Leak visibility**: every pending promise is tracked by its dispatcher
//!   and reported at teardown
//!
//! # Module Structure
//!
//! - [`types`]: lanes, handles, builder errors
//! - [`context`]: executors behind the lanes (pump queues, worker pool)
//! - [`dispatcher`]: dispatchers, scopes, the registry and the global dispatcher
//! - [`promise`]: promises, futures and `.await` support
//! - [`config`]: configuration values, environment and file overrides
//! - [`error`]: error types
//! - [`util`]: generation-tagged slot table

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod promise;
pub mod types;
pub mod util;

mod tracing_compat;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use config::{DispatcherConfig, LeakResponse, WorkerPoolConfig};
pub use context::{Executor, PumpQueue, ThreadContexts, WorkPriority, WorkerPool};
pub use dispatcher::{
    DispatcherBuilder, DispatcherKind, DispatcherScope, PromiseDump, ScopedDispatcher,
    TaskDispatcher,
};
pub use error::{Error, ErrorKind, Result, SetError};
pub use promise::{Future, Promise};
pub use types::{DispatcherHandle, ThreadKind};
