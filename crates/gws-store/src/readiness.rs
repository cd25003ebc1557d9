//! Hydration state surfaced to readers

use std::fmt;

/// Result of a read that may run before hydration finished
///
/// `Loading` means "not known yet", never "empty". Callers that would act on
/// an empty workspace (the context builder, the mutation parser) must treat
/// it as indeterminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness<T> {
    /// Persisted state has not been read yet
    Loading,
    /// Store is authoritative
    Ready(T),
}

impl<T> Readiness<T> {
    /// Check if the value is available
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Check if the store is still loading
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Convert into `Option`, losing the loading distinction
    #[inline]
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading => None,
        }
    }

    /// Map the ready value
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Readiness<U> {
        match self {
            Self::Ready(value) => Readiness::Ready(f(value)),
            Self::Loading => Readiness::Loading,
        }
    }
}

impl<T> Readiness<Option<T>> {
    /// Flatten a ready-but-absent read into `None`
    #[inline]
    #[must_use]
    pub fn flatten(self) -> Option<T> {
        self.ready().flatten()
    }
}

/// What a hydration pass found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// Document decoded and merged
    Loaded {
        /// Artifacts taken from storage
        artifacts: usize,
        /// Artifacts whose kind had no registered schema
        unknown_kinds: usize,
    },
    /// Nothing stored under the key (or no backend configured)
    Empty,
    /// Storage read or decode failed; the session continues in memory
    Failed(String),
    /// The read did not finish before the deadline
    TimedOut,
    /// Hydration had already completed
    AlreadyHydrated,
}

impl fmt::Display for HydrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded {
                artifacts,
                unknown_kinds,
            } => write!(
                f,
                "loaded {artifacts} artifact(s), {unknown_kinds} with unknown kind"
            ),
            Self::Empty => f.write_str("no persisted workspace"),
            Self::Failed(reason) => write!(f, "hydration failed: {reason}"),
            Self::TimedOut => f.write_str("hydration timed out"),
            Self::AlreadyHydrated => f.write_str("already hydrated"),
        }
    }
}
