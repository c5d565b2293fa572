//! Error types and error handling strategy for lanesync.
//!
//! Errors fall into three groups:
//!
//! - **Usage errors** are programmer mistakes (setting a promise twice,
//!   unbalanced scopes, unregistering a stale handle). They are reported
//!   through a single path that logs at `error` and panics in debug builds.
//! - **Construction errors** come from builders and configuration parsing and
//!   surface as [`ErrorKind::InvalidConfig`] via [`BuildError`].
//! - **Resource-not-ready** conditions are not errors at all: lookups that
//!   may miss return `Option`.
//!
//! Panics raised by user callables are never caught or translated.

use core::fmt;

use crate::tracing_compat::error;
use crate::types::BuildError;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Usage ===
    /// A promise was settled more than once.
    PromiseAlreadySet,
    /// A dispatcher scope was exited out of order.
    ScopeMismatch,
    /// A dispatcher handle no longer names a live registration.
    StaleHandle,

    // === Lifecycle ===
    /// A global dispatcher was already explicitly installed.
    GlobalAlreadyInstalled,
    /// An execution context no longer accepts work.
    ContextClosed,

    // === Construction ===
    /// Builder or configuration validation failed.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns true for programmer errors reported through the usage path.
    #[must_use]
    pub const fn is_usage_error(self) -> bool {
        matches!(
            self,
            Self::PromiseAlreadySet | Self::ScopeMismatch | Self::StaleHandle
        )
    }

    /// Returns a short static description of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PromiseAlreadySet => "promise already set",
            Self::ScopeMismatch => "dispatcher scope mismatch",
            Self::StaleHandle => "stale dispatcher handle",
            Self::GlobalAlreadyInstalled => "global dispatcher already installed",
            Self::ContextClosed => "execution context closed",
            Self::InvalidConfig => "invalid configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for lanesync operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if this error is a usage error.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        self.kind.is_usage_error()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        Self::new(ErrorKind::InvalidConfig).with_message(err.to_string())
    }
}

/// A specialized Result type for lanesync operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error returned by `try_set` when the promise was already settled.
///
/// The rejected value is handed back to the caller.
pub struct SetError<T>(pub T);

impl<T> SetError<T> {
    /// Returns the value that could not be stored.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SetError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SetError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SetError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("setting on an already settled promise")
    }
}

impl<T> std::error::Error for SetError<T> {}

/// Reports a usage error: logs it, and panics when debug assertions are on.
///
/// Never panics while the current thread is already unwinding.
#[track_caller]
pub(crate) fn report_usage_error(err: &Error) {
    debug_assert!(err.is_usage_error(), "not a usage error: {err}");
    error!(kind = ?err.kind(), "lanesync usage error: {err}");
    if cfg!(debug_assertions) && !std::thread::panicking() {
        panic!("lanesync usage error: {err}");
    }
}
