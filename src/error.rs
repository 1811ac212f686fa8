// Error taxonomy for the feed engine.
//
// Collaborator calls use anyhow internally; by the time an error reaches the
// engine's view state it has been flattened into a cloneable FeedError so a
// snapshot can carry it. Empty dependencies are not errors at all, see
// `feed::engine::EmptyReason`.

use thiserror::Error;

/// Which collaborator call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Events,
    Following,
    Reaction,
}

impl FetchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchTarget::Events => "activity events",
            FetchTarget::Following => "following list",
            FetchTarget::Reaction => "post reaction",
        }
    }
}

impl std::fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-visible feed error. Never fatal: the feed keeps its last state
/// and can be retried with a refresh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Failed to fetch {target}: {message}")]
    FetchFailure { target: FetchTarget, message: String },
}

impl FeedError {
    /// Wrap a collaborator error, keeping the whole context chain.
    pub fn fetch(target: FetchTarget, err: &anyhow::Error) -> Self {
        FeedError::FetchFailure {
            target,
            message: format!("{err:#}"),
        }
    }

    pub fn target(&self) -> FetchTarget {
        match self {
            FeedError::FetchFailure { target, .. } => *target,
        }
    }
}

/// Why a raw record could not become an ActivityEvent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Activity record is not a JSON object")]
    NotAnObject,

    #[error("Activity record has no id")]
    MissingId,
}
