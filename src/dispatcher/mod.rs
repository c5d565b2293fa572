//! Dispatchers: where callables run and who owns the promises they create.
//!
//! - [`TaskDispatcher`]: runs callables on a [`ThreadKind`](crate::types::ThreadKind)
//!   lane inside a [`DispatcherScope`], and tracks pending promises.
//! - [`ScopedDispatcher`]: owns a dispatcher and tears it down on drop.
//! - [`global`]: the process-wide dispatcher and process shutdown.
//! - [`registry()`]: weak, generation-checked lookup by [`DispatcherHandle`](crate::types::DispatcherHandle).
//!
//! ```ignore
//! let meshing = DispatcherBuilder::new()
//!     .name("meshing")
//!     .contexts(contexts)
//!     .build_scoped()?;
//!
//! meshing.dispatch(ThreadKind::Worker, || {
//!     let promise = Promise::<Mesh>::new(); // owned by `meshing`
//!     // ...
//! });
//! ```

mod builder;
mod diagnostics;
pub mod global;
mod registry;
mod scope;
mod scoped;
mod task_dispatcher;

pub use builder::DispatcherBuilder;
pub use diagnostics::PromiseDump;
pub use registry::{registry, DispatcherRegistry};
pub use scope::DispatcherScope;
pub use scoped::ScopedDispatcher;
pub use task_dispatcher::{DispatcherKind, TaskDispatcher};
