//! UK postcode structural validation.
//!
//! Only the *shape* is checked here (outward code, optional space, inward
//! code). Whether the postcode actually exists is the backend's call.

use regex::Regex;
use std::sync::LazyLock;

use crate::SearchError;

/// Outward code: 1–2 letters, a digit or `R`, an optional alphanumeric.
/// Inward code: a digit and two letters from the unambiguous set (no
/// C, I, K, M, O or V).
static UK_POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9R][0-9A-Z]?\s?[0-9][ABD-HJLNP-UW-Z]{2}$").expect("valid regex")
});

/// Message used for every structural postcode failure.
pub const INVALID_POSTCODE_MESSAGE: &str = "Invalid UK postcode format";

/// Uppercases and trims user input.
#[must_use]
pub fn normalize_postcode(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Returns `true` if `raw` (after normalization) has UK postcode shape.
#[must_use]
pub fn is_valid_postcode(raw: &str) -> bool {
    UK_POSTCODE_RE.is_match(&normalize_postcode(raw))
}

/// Normalizes `raw` and checks its shape.
///
/// # Errors
///
/// Returns [`SearchError::Format`] if the normalized input is not a
/// structurally valid UK postcode.
pub fn parse_postcode(raw: &str) -> Result<String, SearchError> {
    let postcode = normalize_postcode(raw);
    if UK_POSTCODE_RE.is_match(&postcode) {
        Ok(postcode)
    } else {
        Err(SearchError::Format {
            message: INVALID_POSTCODE_MESSAGE.to_string(),
        })
    }
}

/// Checks that a reverse-lookup coordinate is a finite WGS84 position.
///
/// # Errors
///
/// Returns [`SearchError::Format`] if either value is out of range.
pub fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), SearchError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(SearchError::Format {
            message: format!("Latitude must be between -90 and 90, got {latitude}"),
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(SearchError::Format {
            message: format!("Longitude must be between -180 and 180, got {longitude}"),
        });
    }
    Ok(())
}
