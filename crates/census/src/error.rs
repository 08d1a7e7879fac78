use std::error::Error;
use std::fmt;

/// Why a tracking operation was refused.
///
/// A refused operation never modifies the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackError {
    /// `begin_tracking` was handed a dangling `Weak` (nothing to track).
    NoInstance,
    /// The tracker is already linked into its registry.
    AlreadyTracking,
    /// The tracker is idle.
    NotTracking,
    /// A traversal of this registry is open on the calling thread.
    TraversalOpen,
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInstance => write!(f, "no instance to track"),
            Self::AlreadyTracking => write!(f, "tracker is already tracking an instance"),
            Self::NotTracking => write!(f, "tracker is not tracking any instance"),
            Self::TraversalOpen => {
                write!(f, "cannot reorder a registry while this thread traverses it")
            }
        }
    }
}

impl Error for TrackError {}
