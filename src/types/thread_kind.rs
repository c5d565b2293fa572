//! Logical execution lanes.

use core::fmt;

/// The logical thread a callable is dispatched to.
///
/// A lane is a name, not an OS thread: the primary and secondary lanes are
/// serial contexts drained by whoever owns them, the worker lane is a shared
/// pool, and the caller lane runs inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreadKind {
    /// Run inline on the dispatching thread.
    Caller,
    /// The single "main" context, e.g. a frame-update pump.
    Primary,
    /// The second distinguished single context, e.g. a render pump.
    Secondary,
    /// The shared background worker pool, at low priority.
    Worker,
}

impl ThreadKind {
    /// Every lane, in declaration order.
    pub const ALL: [Self; 4] = [Self::Caller, Self::Primary, Self::Secondary, Self::Worker];

    /// Short lowercase name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Worker => "worker",
        }
    }

    /// Returns true for lanes that serialize the work submitted to them.
    #[must_use]
    pub const fn is_serial(self) -> bool {
        matches!(self, Self::Primary | Self::Secondary)
    }

    /// Returns true if dispatching to this lane runs the callable immediately.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::Caller)
    }

    /// The lane a continuation uses when the value is already available.
    ///
    /// Inline delivery would run the callback on the attacher's stack, so
    /// `Caller` is redirected to the worker pool; every other lane is kept.
    #[must_use]
    pub const fn deferred(self) -> Self {
        match self {
            Self::Caller => Self::Worker,
            other => other,
        }
    }
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
