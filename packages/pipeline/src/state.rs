//! Submission states and progress reporting.

use strum_macros::{AsRefStr, Display};

/// Where a submission is in its lifecycle.
///
/// ```text
/// Idle → Validating → CheckingPostcode → Searching → Normalizing → Success
///             │              │               │            │
///             └──────────────┴───────────────┴────────────┴──→ Failed
/// ```
///
/// Reverse lookups go straight from `Validating` to `Searching`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Checking input shape locally.
    Validating,
    /// Asking the backend whether the postcode exists.
    CheckingPostcode,
    /// Running the backend search.
    Searching,
    /// Validating and reshaping the backend response.
    Normalizing,
    /// Finished with a result.
    Success,
    /// Finished with an error.
    Failed,
}

impl SubmissionState {
    /// `true` while a submission is between `Validating` and a terminal
    /// state.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Validating | Self::CheckingPostcode | Self::Searching | Self::Normalizing
        )
    }

    /// `true` for `Success` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether the machine may move from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle | Self::Success | Self::Failed, Self::Validating)
            | (Self::Validating, Self::CheckingPostcode | Self::Searching)
            | (Self::CheckingPostcode, Self::Searching)
            | (Self::Searching, Self::Normalizing)
            | (Self::Normalizing, Self::Success) => true,
            (from, Self::Failed) => from.is_pending(),
            _ => false,
        }
    }

    /// Short label for a pending indicator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Validating => "Checking input...",
            Self::CheckingPostcode => "Checking postcode...",
            Self::Searching => "Searching...",
            Self::Normalizing => "Processing results...",
            Self::Success => "Done",
            Self::Failed => "Failed",
        }
    }
}

/// Receives state transitions as a submission runs.
///
/// Surfaces use this to keep a pending indicator up for the whole
/// multi-step sequence.
pub trait SearchProgress: Send + Sync {
    /// Called on every transition, terminal ones included.
    fn on_transition(&self, state: SubmissionState);
}

/// Ignores all transitions.
pub struct NullProgress;

impl SearchProgress for NullProgress {
    fn on_transition(&self, _state: SubmissionState) {}
}
