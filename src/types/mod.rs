//! Core value types shared across lanesync.
//!
//! - [`thread_kind`]: the logical lanes work is dispatched onto
//! - [`handle`]: generation-tagged weak dispatcher handles
//! - [`builder`]: validation errors for builders

pub mod builder;
pub mod handle;
pub mod thread_kind;

pub use builder::{BuildError, BuildResult};
pub use handle::DispatcherHandle;
pub use thread_kind::ThreadKind;
