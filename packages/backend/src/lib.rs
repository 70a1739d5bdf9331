#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the postcode search backend.
//!
//! The backend owns geocoding, postcode existence checks and persistence
//! of search records. This crate only knows its HTTP surface:
//!
//! | Method | Path | Body / query |
//! |---|---|---|
//! | `POST` | `/postcodes/validate` | `{ "postcode": "..." }` |
//! | `POST` | `/search` | `{ "postcode": "..." }` |
//! | `GET` | `/search` | `?latitude=..&longitude=..` |
//! | `GET` | `/health` | (none) |
//!
//! Callers depend on the [`SearchBackend`] trait; [`http::HttpBackend`]
//! is the `reqwest` implementation. Response bodies are returned as raw
//! [`serde_json::Value`] so that contract validation stays in one place.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpBackend;

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent, timed out, or the body could not be
    /// read as JSON.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The configured base URL is unusable.
    #[error("Invalid backend URL '{url}'")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },
}

impl BackendError {
    /// The HTTP status, when the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(_) | Self::InvalidUrl { .. } => None,
        }
    }
}

/// The backend HTTP surface.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Asks the backend whether `postcode` is a real, active UK postcode.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or any non-2xx status.
    async fn validate_postcode(&self, postcode: &str) -> Result<(), BackendError>;

    /// Runs a search for `postcode` and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or any non-2xx status.
    async fn search_postcode(&self, postcode: &str) -> Result<serde_json::Value, BackendError>;

    /// Runs a reverse lookup and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or any non-2xx status.
    async fn search_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<serde_json::Value, BackendError>;

    /// Fetches the raw backend health report.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or any non-2xx status.
    async fn health(&self) -> Result<serde_json::Value, BackendError>;
}
