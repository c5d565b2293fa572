//! Tracing compatibility layer.
//!
//! With the `tracing-integration` feature (on by default) this module
//! re-exports the `tracing` event macros. Without it, the same names expand
//! to nothing, so call sites never need their own `cfg` gates.
//!
//! ```rust,ignore
//! use crate::tracing_compat::{debug, warn};
//!
//! debug!(name = %name, "dispatcher created");
//! warn!(count, "dispatcher torn down with pending promises");
//! ```

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, error, info, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop::{debug, error, info, trace, warn};
