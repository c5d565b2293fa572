//! Write-once promises and their read-many futures.
//!
//! A [`Promise`] and every [`Future`] obtained from it share one cell. The
//! value is written once; each continuation attached to the future then
//! fires exactly once, in attachment order, on the lane it asked for.
//!
//! ```ignore
//! let promise = Promise::<u32>::new();
//! promise
//!     .future()
//!     .then(ThreadKind::Worker, |n| n * 2)
//!     .on_settled(ThreadKind::Primary, |n| println!("{n}"));
//! promise.set(21);
//! ```
//!
//! Values must be `Clone`: every continuation receives its own copy. Wrap
//! large payloads in `Arc`.

mod awaitable;
mod future;
mod promise;
mod state;

pub use awaitable::Awaited;
pub use future::Future;
pub use promise::Promise;
