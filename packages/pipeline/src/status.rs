//! Backend health check.

use postcode_map_backend::{BackendError, SearchBackend};
use postcode_map_contract::ValidationError;
use postcode_map_search_models::HealthResponse;
use thiserror::Error;

/// Why the backend status could not be determined.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The health endpoint could not be reached or returned an error.
    #[error("Backend unavailable: {0}")]
    Unavailable(#[from] BackendError),

    /// The health endpoint answered with an unexpected body.
    #[error("Backend health response did not match the expected contract: {0}")]
    Schema(#[from] ValidationError),
}

/// Fetches and validates the backend health report.
///
/// # Errors
///
/// * [`StatusError::Unavailable`] on transport failure or non-2xx status
/// * [`StatusError::Schema`] if the body breaks the health contract
pub async fn check_health(backend: &dyn SearchBackend) -> Result<HealthResponse, StatusError> {
    let raw = backend.health().await?;
    let health = postcode_map_contract::validate_health(&raw)?;
    log::debug!(
        "Backend {} (database {}, uptime {}s)",
        health.status,
        health.database.status,
        health.uptime
    );
    Ok(health)
}
