#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Response contract for the postcode search backend.
//!
//! Raw backend JSON passes through two steps before the rest of the
//! front end sees it:
//!
//! 1. [`validate`] evaluates the [`search::SEARCH_RESPONSE`] schema and
//!    reports *every* field-level violation at once. A body that is valid
//!    JSON but the wrong shape is a [`ValidationError`], never a panic.
//! 2. [`normalize`] regroups the typed record into the front-end
//!    [`NormalizedSearchResult`], dropping storage metadata.

pub mod normalize;
pub mod schema;
pub mod search;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

use postcode_map_search_models::{BackendSearchResult, HealthResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use normalize::normalize;
pub use postcode_map_search_models::NormalizedSearchResult;
pub use schema::{Issue, IssueKind, Schema};

/// The backend response did not match the expected contract.
#[derive(Debug, Clone, Error)]
#[error("{message} ({} issue(s))", issues.len())]
pub struct ValidationError {
    /// Summary line.
    pub message: String,
    /// Every field-level violation found.
    pub issues: Vec<Issue>,
}

impl ValidationError {
    /// Creates a validation error from a non-empty issue list.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            message: "Validation error".to_string(),
            issues,
        }
    }

    /// Issues rendered one per line, for ops-facing output.
    #[must_use]
    pub fn rendered_issues(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Checks `raw` against `schema` and, if it conforms, decodes it as `T`.
///
/// # Errors
///
/// Returns [`ValidationError`] listing every structural issue, or a single
/// issue if the typed decode fails after the structural check passed.
pub fn validate_with<T: DeserializeOwned>(
    schema: &Schema,
    raw: &Value,
) -> Result<T, ValidationError> {
    let issues = schema.check(raw);
    if !issues.is_empty() {
        return Err(ValidationError::new(issues));
    }

    T::deserialize(raw).map_err(|e| ValidationError::new(vec![Issue::custom("", e.to_string())]))
}

/// Validates a backend `/search` response.
///
/// # Errors
///
/// Returns [`ValidationError`] if the body does not match the contract.
pub fn validate(raw: &Value) -> Result<BackendSearchResult, ValidationError> {
    validate_with(&search::SEARCH_RESPONSE, raw)
}

/// Validates a backend `/health` response.
///
/// # Errors
///
/// Returns [`ValidationError`] if the body does not match the contract.
pub fn validate_health(raw: &Value) -> Result<HealthResponse, ValidationError> {
    validate_with(&search::HEALTH_RESPONSE, raw)
}

/// [`validate`] followed by [`normalize`].
///
/// # Errors
///
/// Returns [`ValidationError`] if the body does not match the contract.
pub fn parse_search_response(raw: &Value) -> Result<NormalizedSearchResult, ValidationError> {
    validate(raw).map(normalize)
}
