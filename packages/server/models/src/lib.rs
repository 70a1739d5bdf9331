#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the postcode map server.
//!
//! These are the JSON shapes of the `/api` surface. They wrap the domain
//! types rather than re-declaring them so that the history, table and map
//! payloads stay identical to what the library crates serialize.

use postcode_map_pipeline::{SearchError, Submission};
use postcode_map_search_models::{HealthResponse, NormalizedSearchResult, SearchId};
use postcode_map_view::{MapMarker, SortOrder, Viewport};
use serde::{Deserialize, Serialize};

/// `GET /api/health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Always `true` when the server answers.
    pub healthy: bool,
    /// Crate version.
    pub version: String,
}

/// `POST /api/search` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw user input.
    pub postcode: String,
}

/// `GET /api/search` query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoordinateQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Error half of a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchError {
    /// `format`, `unknown_postcode`, `backend`, `schema` or `busy`.
    pub kind: String,
    /// Single-line message for the user.
    pub msg: String,
    /// Itemized contract violations, for `schema` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

impl From<&SearchError> for ApiSearchError {
    fn from(e: &SearchError) -> Self {
        Self {
            kind: e.kind().to_string(),
            msg: e.user_message(),
            issues: e.issues(),
        }
    }
}

/// Search response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchResponse {
    pub success: bool,
    /// The input exactly as submitted.
    pub entered_postcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NormalizedSearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiSearchError>,
}

impl ApiSearchResponse {
    /// Refusal sent while another search is in flight.
    #[must_use]
    pub fn busy(entered_postcode: String) -> Self {
        Self {
            success: false,
            entered_postcode,
            data: None,
            error: Some(ApiSearchError {
                kind: "busy".to_string(),
                msg: "A search is already in progress".to_string(),
                issues: None,
            }),
        }
    }
}

impl From<Submission> for ApiSearchResponse {
    fn from(submission: Submission) -> Self {
        match submission.outcome {
            Ok(data) => Self {
                success: true,
                entered_postcode: submission.entered_postcode,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                success: false,
                entered_postcode: submission.entered_postcode,
                data: None,
                error: Some(ApiSearchError::from(&e)),
            },
        }
    }
}

/// Error half of a status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatusError {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

/// `GET /api/status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HealthResponse>,
    /// `data.uptime` formatted for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    /// `data.timestamp` formatted for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiStatusError>,
}

/// `GET /api/table` query.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

/// `GET /api/map` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMap {
    pub viewport: Viewport,
    /// `true` once the user has panned or zoomed.
    pub manual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<SearchId>,
    pub markers: Vec<MapMarker>,
}

/// Result of a history mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiChanged {
    /// Number of entries that changed.
    pub changed: usize,
}

/// Error body for requests that name something missing or invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use postcode_map_backend::BackendError;
    use serde_json::json;

    use super::*;

    #[test]
    fn failed_search_omits_data_and_issues() {
        let response = ApiSearchResponse::from(Submission {
            entered_postcode: "gl1 1lb".to_string(),
            outcome: Err(SearchError::Backend(BackendError::Status {
                status: 500,
                url: "http://backend/search".to_string(),
            })),
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "enteredPostcode": "gl1 1lb",
                "error": {
                    "kind": "backend",
                    "msg": "The search service is unavailable, please try again"
                }
            })
        );
    }

    #[test]
    fn busy_response() {
        let response = ApiSearchResponse::busy("SW1A 2AA".to_string());
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, "busy");
    }

    #[test]
    fn map_response_reads_back() {
        let map = ApiMap {
            viewport: Viewport {
                center: postcode_map_view::LatLng {
                    lat: 51.50354,
                    lng: -0.127695,
                },
                zoom: 13,
            },
            manual: false,
            selected: Some(7),
            markers: vec![
                MapMarker {
                    kind: postcode_map_view::MarkerKind::Search,
                    search_id: 7,
                    position: postcode_map_view::LatLng {
                        lat: 51.50354,
                        lng: -0.127695,
                    },
                    popup: Some("SW1A 2AA".to_string()),
                },
                MapMarker {
                    kind: postcode_map_view::MarkerKind::Crime,
                    search_id: 7,
                    position: postcode_map_view::LatLng {
                        lat: 51.504012,
                        lng: -0.128844,
                    },
                    popup: None,
                },
            ],
        };

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["markers"][0]["searchId"], json!(7));
        assert_eq!(value["markers"][1]["kind"], json!("crime"));
        assert!(value["markers"][1].get("popup").is_none());

        let back: ApiMap = serde_json::from_value(value).unwrap();
        assert_eq!(back.markers, map.markers);
        assert_eq!(back.viewport, map.viewport);
        assert_eq!(back.selected, Some(7));
    }

    #[test]
    fn table_query_parses_sort() {
        let query: TableQuery = serde_json::from_value(json!({ "sort": "asc" })).unwrap();
        assert_eq!(query.sort, Some(SortOrder::Ascending));
        let query: TableQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.sort, None);
    }
}
