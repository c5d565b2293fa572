//! Validation errors raised while building dispatchers and executors.
//!
//! Builders in lanesync are move-based: every setter takes `self` and returns
//! `Self`, and `build*()` performs cross-field validation before anything is
//! registered or spawned.
//!
//! ```ignore
//! let dispatcher = DispatcherBuilder::new()
//!     .name("meshing")
//!     .contexts(contexts)
//!     .build_scoped()?;
//! ```
//!
//! Setters never fail. Everything that can go wrong surfaces from `build*()`
//! as a [`BuildError`], including unparseable environment overrides.

/// Errors that can occur when building a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A required field was not set.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A field value failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// The field that failed validation.
        field: &'static str,
        /// Why the value is invalid.
        reason: String,
    },

    /// A range constraint was violated (min > max).
    #[error("invalid {field} range: min ({min}) must be <= max ({max})")]
    InvalidRange {
        /// The field or field pair with the range issue.
        field: &'static str,
        /// The minimum value provided.
        min: u64,
        /// The maximum value provided.
        max: u64,
    },

    /// A custom validation error, typically from environment or file parsing.
    #[error("{message}")]
    Custom {
        /// The error message.
        message: String,
    },
}

impl BuildError {
    /// Creates a `MissingRequired` error.
    #[must_use]
    pub const fn missing_required(field: &'static str) -> Self {
        Self::MissingRequired { field }
    }

    /// Creates an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidRange` error.
    #[must_use]
    pub const fn invalid_range(field: &'static str, min: u64, max: u64) -> Self {
        Self::InvalidRange { field, min, max }
    }

    /// Creates a `Custom` error.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = BuildError::missing_required("contexts");
        assert_eq!(err.to_string(), "missing required configuration: contexts");
        let err = BuildError::invalid_value("leak_response", "expected panic/log/silent");
        assert_eq!(
            err.to_string(),
            "invalid leak_response: expected panic/log/silent"
        );
    }

    #[test]
    fn range_error_reports_both_bounds() {
        let err = BuildError::invalid_range("worker_threads", 8, 2);
        assert_eq!(
            err.to_string(),
            "invalid worker_threads range: min (8) must be <= max (2)"
        );
    }

    #[test]
    fn custom_is_the_bare_message() {
        assert_eq!(BuildError::custom("bad env").to_string(), "bad env");
    }
}
