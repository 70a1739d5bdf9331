#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Search result types shared across the postcode map.
//!
//! Two families of types live here:
//!
//! - `Backend*` types mirror the JSON returned by the backend `/search`
//!   endpoint, including its storage metadata (`_id`, `__v`, `_links`,
//!   unpopulated reference ids).
//! - The front-end types ([`NormalizedSearchResult`], [`Postcode`],
//!   [`BusStop`], [`Crime`]) carry only domain fields and are what the
//!   history cache stores and the view layer projects.
//!
//! Field names follow the backend's wire names exactly (`searchID`,
//! `Northing`, `ATCO_long`, ...) so that serialized front-end values stay
//! interchangeable with what earlier clients persisted.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Server-assigned sequential search identifier.
pub type SearchId = i64;

// ---------------------------------------------------------------------------
// Backend contract
// ---------------------------------------------------------------------------

/// A hypermedia link in the backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendLink {
    /// URL of the linked resource.
    pub href: String,
}

/// HATEOAS links attached to a backend search record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendLinks {
    /// Link to this search record.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<BackendLink>,
    /// Link to the postcode resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<BackendLink>,
    /// Alternate representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<BackendLink>,
}

/// Postcode record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendPostcode {
    /// Storage id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Postcode in the backend's normalized format.
    pub postcode: String,
    /// Ordnance Survey easting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eastings: Option<f64>,
    /// Ordnance Survey northing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub northings: Option<f64>,
    /// Constituent country (England, Scotland, Wales, Northern Ireland).
    pub country: String,
    /// WGS84 longitude.
    pub longitude: f64,
    /// WGS84 latitude.
    pub latitude: f64,
    /// Region name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Parliamentary constituency name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parliamentary_constituency: Option<String>,
    /// Administrative district name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_district: Option<String>,
    /// Administrative ward name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_ward: Option<String>,
    /// Parish name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parish: Option<String>,
    /// Administrative county; always present on the wire, often `null`.
    pub admin_county: Option<String>,
    /// Storage version counter.
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// Bus stop record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendBusStop {
    /// Storage id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Long ATCO code.
    #[serde(rename = "ATCO_long")]
    pub atco_long: String,
    /// Short ATCO code.
    #[serde(rename = "ATCO_short", default, skip_serializing_if = "Option::is_none")]
    pub atco_short: Option<String>,
    /// Common name of the stop.
    #[serde(rename = "CommonName", default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// Street the stop is on.
    #[serde(rename = "Street", default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Longitude as the backend's string representation.
    #[serde(rename = "Longitude", default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    /// Latitude as the backend's string representation.
    #[serde(rename = "Latitude", default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    /// British National Grid northing.
    #[serde(rename = "Northing")]
    pub northing: String,
    /// British National Grid easting.
    #[serde(rename = "Easting")]
    pub easting: String,
    /// Storage version counter.
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// Crime record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendCrime {
    /// Storage id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Police data crime identifier.
    #[serde(rename = "crimeID", default, skip_serializing_if = "Option::is_none")]
    pub crime_id: Option<i64>,
    /// Latitude of the (anonymized) crime location.
    pub latitude: f64,
    /// Longitude of the (anonymized) crime location.
    pub longitude: f64,
    /// Category slug, e.g. `anti-social-behaviour`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_category: Option<String>,
    /// Month of the crime, `YYYY-MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_date: Option<String>,
    /// Outcome category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_category: Option<String>,
    /// Date of the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_date: Option<String>,
    /// Storage version counter.
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// The `/search` response as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSearchResult {
    /// Storage id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Sequential search identifier.
    #[serde(rename = "searchID")]
    pub search_id: SearchId,
    /// WGS84 latitude of the searched location.
    pub latitude: f64,
    /// WGS84 longitude of the searched location.
    pub longitude: f64,
    /// British National Grid northing.
    #[serde(rename = "Northing")]
    pub northing: String,
    /// British National Grid easting.
    #[serde(rename = "Easting")]
    pub easting: String,
    /// Whether the search was made from coordinates.
    #[serde(rename = "reverseLookup")]
    pub reverse_lookup: bool,
    /// Postcode details.
    #[serde(rename = "Postcode")]
    pub postcode: BackendPostcode,
    /// Nearby bus stops.
    #[serde(rename = "queryBusStops")]
    pub bus_stops: Vec<BackendBusStop>,
    /// Crimes recorded in the area.
    #[serde(rename = "queryCrimes")]
    pub crimes: Vec<BackendCrime>,
    /// Unpopulated reference to the linked ATCO record.
    #[serde(rename = "linkedATCO", default, skip_serializing_if = "Option::is_none")]
    pub linked_atco: Option<String>,
    /// Unpopulated reference to the linked crime list.
    #[serde(rename = "linkedCrimeList", default, skip_serializing_if = "Option::is_none")]
    pub linked_crime_list: Option<String>,
    /// Hypermedia links.
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<BackendLinks>,
    /// Storage version counter.
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

// ---------------------------------------------------------------------------
// Front-end shape
// ---------------------------------------------------------------------------

/// Postcode details without storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postcode {
    /// Postcode in the backend's normalized format.
    pub postcode: String,
    /// Ordnance Survey easting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eastings: Option<f64>,
    /// Ordnance Survey northing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub northings: Option<f64>,
    /// Constituent country.
    pub country: String,
    /// WGS84 longitude.
    pub longitude: f64,
    /// WGS84 latitude.
    pub latitude: f64,
    /// Region name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Parliamentary constituency name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parliamentary_constituency: Option<String>,
    /// Administrative district name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_district: Option<String>,
    /// Administrative ward name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_ward: Option<String>,
    /// Parish name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parish: Option<String>,
    /// Administrative county, `null` when the area has none.
    #[serde(default)]
    pub admin_county: Option<String>,
}

/// A bus stop near the searched location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStop {
    /// Long ATCO code.
    #[serde(rename = "ATCO_long")]
    pub atco_long: String,
    /// Short ATCO code.
    #[serde(rename = "ATCO_short", default, skip_serializing_if = "Option::is_none")]
    pub atco_short: Option<String>,
    /// Common name of the stop.
    #[serde(rename = "CommonName", default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// Street the stop is on.
    #[serde(rename = "Street", default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Longitude, as sent by the backend.
    #[serde(rename = "Longitude", default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    /// Latitude, as sent by the backend.
    #[serde(rename = "Latitude", default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    /// British National Grid northing.
    #[serde(rename = "Northing")]
    pub northing: String,
    /// British National Grid easting.
    #[serde(rename = "Easting")]
    pub easting: String,
}

impl BusStop {
    /// Parses the string coordinates into `(latitude, longitude)`.
    ///
    /// Returns `None` when either is missing or not a finite number.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.as_deref()?.trim().parse::<f64>().ok()?;
        let lng = self.longitude.as_deref()?.trim().parse::<f64>().ok()?;
        (lat.is_finite() && lng.is_finite()).then_some((lat, lng))
    }

    /// Best human-readable label for the stop.
    #[must_use]
    pub fn label(&self) -> &str {
        self.common_name.as_deref().unwrap_or(&self.atco_long)
    }
}

/// A crime recorded near the searched location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crime {
    /// Police data crime identifier.
    #[serde(rename = "crimeID", default, skip_serializing_if = "Option::is_none")]
    pub crime_id: Option<i64>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Category slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_category: Option<String>,
    /// Month of the crime, `YYYY-MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_date: Option<String>,
    /// Outcome category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_category: Option<String>,
    /// Date of the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_date: Option<String>,
}

/// Search context and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Sequential search identifier, the history key.
    #[serde(rename = "searchID")]
    pub search_id: SearchId,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// British National Grid northing.
    #[serde(rename = "Northing")]
    pub northing: String,
    /// British National Grid easting.
    #[serde(rename = "Easting")]
    pub easting: String,
    /// Whether the search was made from coordinates.
    #[serde(rename = "reverseLookup")]
    pub reverse_lookup: bool,
    /// Postcode details.
    #[serde(rename = "Postcode")]
    pub postcode: Postcode,
}

/// A search result in the front-end shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSearchResult {
    /// Search context and location.
    pub metadata: SearchMetadata,
    /// Nearby bus stops.
    #[serde(rename = "queryBusStops")]
    pub bus_stops: Vec<BusStop>,
    /// Crimes in the area.
    #[serde(rename = "queryCrimes")]
    pub crimes: Vec<Crime>,
}

impl NormalizedSearchResult {
    /// The history key of this result.
    #[must_use]
    pub const fn search_id(&self) -> SearchId {
        self.metadata.search_id
    }

    /// The postcode string of this result.
    #[must_use]
    pub fn postcode(&self) -> &str {
        &self.metadata.postcode.postcode
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Overall backend status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    /// Backend is serving requests.
    Healthy,
    /// Backend reported a problem.
    Unhealthy,
}

/// Backend database connection status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseStatus {
    /// Connected to its database.
    Connected,
    /// Not connected.
    Disconnected,
}

/// Database section of the health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// Whether the backend holds a live database connection.
    pub connected: bool,
    /// Connection status.
    pub status: DatabaseStatus,
}

/// The backend `/health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// ISO 8601 time the report was produced.
    pub timestamp: String,
    /// Backend process uptime in seconds.
    pub uptime: f64,
    /// Database section.
    pub database: DatabaseHealth,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// JSON body for the postcode endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostcodeBody {
    /// Normalized postcode.
    pub postcode: String,
}
