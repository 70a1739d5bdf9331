#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Search submission pipeline.
//!
//! Turns raw user input into a [`Submission`]: validate the postcode
//! shape locally, ask the backend whether it exists, run the search, and
//! push the body through the response contract. Every failure is caught
//! here and returned as a typed [`SearchError`]; nothing escapes as a
//! panic.
//!
//! The pipeline never touches the search history. Callers feed a
//! successful [`Submission`] into the cache themselves.

pub mod pipeline;
pub mod postcode;
pub mod state;
pub mod status;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

use postcode_map_backend::BackendError;
use postcode_map_contract::ValidationError;
use postcode_map_search_models::NormalizedSearchResult;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use pipeline::SearchPipeline;
pub use state::{NullProgress, SearchProgress, SubmissionState};

/// Why a submission failed.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The input does not have UK postcode (or coordinate) shape. No
    /// request was sent.
    #[error("{message}")]
    Format {
        /// Human-readable reason.
        message: String,
    },

    /// The postcode is well formed but the backend did not accept it.
    #[error("Postcode {postcode} was not recognised: {source}")]
    UnknownPostcode {
        /// The normalized postcode that was checked.
        postcode: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// The search endpoint could not be reached or returned an error.
    #[error("Backend search failed: {0}")]
    Backend(#[source] BackendError),

    /// The search endpoint answered with a body that breaks the contract.
    #[error("Backend response did not match the expected contract: {0}")]
    Schema(#[source] ValidationError),
}

/// Discriminant of [`SearchError`], for wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SearchErrorKind {
    /// See [`SearchError::Format`].
    Format,
    /// See [`SearchError::UnknownPostcode`].
    UnknownPostcode,
    /// See [`SearchError::Backend`].
    Backend,
    /// See [`SearchError::Schema`].
    Schema,
}

impl SearchError {
    /// The error's kind.
    #[must_use]
    pub const fn kind(&self) -> SearchErrorKind {
        match self {
            Self::Format { .. } => SearchErrorKind::Format,
            Self::UnknownPostcode { .. } => SearchErrorKind::UnknownPostcode,
            Self::Backend(_) => SearchErrorKind::Backend,
            Self::Schema(_) => SearchErrorKind::Schema,
        }
    }

    /// Single-line message suitable for the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Format { message } => message.clone(),
            Self::UnknownPostcode { postcode, .. } => {
                format!("{postcode} is not a recognised UK postcode")
            }
            Self::Backend(_) => "The search service is unavailable, please try again".to_string(),
            Self::Schema(_) => "The search service sent an unexpected response".to_string(),
        }
    }

    /// The itemized contract violations, for schema errors only.
    #[must_use]
    pub fn issues(&self) -> Option<Vec<String>> {
        match self {
            Self::Schema(e) => Some(e.rendered_issues()),
            _ => None,
        }
    }

    /// Whether retrying the same input might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Returned by `try_submit*` while another submission is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("A search is already in progress")]
pub struct PipelineBusy;

/// The outcome of one submission.
#[derive(Debug)]
pub struct Submission {
    /// The user's literal input, echoed back so the UI can keep it after
    /// the async work completes.
    pub entered_postcode: String,
    /// The normalized result or the reason there is none.
    pub outcome: Result<NormalizedSearchResult, SearchError>,
}

impl Submission {
    /// `true` if the submission produced a result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&NormalizedSearchResult> {
        self.outcome.as_ref().ok()
    }

    /// The error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&SearchError> {
        self.outcome.as_ref().err()
    }
}
