//! Versioned history blob.
//!
//! The blob is `{ "version": N, "items": [...] }`. Older layouts are read
//! into their own record type and carried forward one version at a time
//! until they reach [`CURRENT_VERSION`].
//!
//! | Version | Record |
//! |---|---|
//! | 0, 1 | `{ response, createdAt? }` (`hidden` may be missing) |
//! | 2 | `{ response, createdAt, hidden }` |
//!
//! Records are read leniently in every version: an entry survives as long
//! as its `searchID` parses.

use chrono::{DateTime, Utc};
use postcode_map_search_models::{
    BusStop, Crime, NormalizedSearchResult, Postcode, SearchId, SearchMetadata,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{HistoryEntry, PersistenceError};

/// Version written by this build.
pub const CURRENT_VERSION: u32 = 2;

type Object = Map<String, Value>;

#[derive(Serialize)]
struct BlobOut<'a> {
    version: u32,
    items: &'a [HistoryEntry],
}

/// One stored record with the fields every version may leave out.
#[derive(Debug)]
struct StoredEntry {
    response: NormalizedSearchResult,
    created_at: Option<DateTime<Utc>>,
    hidden: Option<bool>,
}

/// A decoded blob, tagged by the layout it was written in.
#[derive(Debug)]
enum PersistedHistory {
    V1(Vec<StoredEntry>),
    V2(Vec<StoredEntry>),
}

impl PersistedHistory {
    fn into_current(self, now: DateTime<Utc>) -> Vec<HistoryEntry> {
        match self {
            Self::V1(items) => Self::V2(migrate_v1(items)).into_current(now),
            Self::V2(items) => items
                .into_iter()
                .map(|item| HistoryEntry {
                    response: item.response,
                    created_at: item.created_at.unwrap_or(now),
                    hidden: item.hidden.unwrap_or(false),
                })
                .collect(),
        }
    }
}

/// Version 1 had no hidden flag: every entry was on the map.
fn migrate_v1(items: Vec<StoredEntry>) -> Vec<StoredEntry> {
    items
        .into_iter()
        .map(|item| StoredEntry {
            hidden: Some(item.hidden.unwrap_or(false)),
            ..item
        })
        .collect()
}

/// Serializes `items` as a current-version blob.
///
/// # Errors
///
/// Returns [`PersistenceError::Json`] if serialization fails.
pub fn encode(items: &[HistoryEntry]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&BlobOut {
        version: CURRENT_VERSION,
        items,
    })?)
}

/// Reads a blob of any known version into current entries.
///
/// Never fails: an unparseable blob yields no entries. A record is kept
/// whenever its `searchID` parses; missing or malformed fields around it
/// fall back to defaults, and `now` stands in for missing creation times.
#[must_use]
pub fn decode(blob: &str, now: DateTime<Utc>) -> Vec<HistoryEntry> {
    let root: Value = match serde_json::from_str(blob) {
        Ok(root) => root,
        Err(e) => {
            log::warn!("Discarding unreadable search history: {e}");
            return Vec::new();
        }
    };

    let (version, items) = envelope(root);

    let persisted = match version {
        0 | 1 => PersistedHistory::V1(records(items, version)),
        CURRENT_VERSION => PersistedHistory::V2(records(items, version)),
        newer => {
            log::warn!(
                "Search history version {newer} is newer than {CURRENT_VERSION}, reading it as {CURRENT_VERSION}"
            );
            PersistedHistory::V2(records(items, version))
        }
    };

    persisted.into_current(now)
}

/// Splits a blob into its version and item list.
///
/// Also accepts the `{ "state": { "items": [...] }, "version": N }`
/// envelope used by older browser clients.
fn envelope(mut root: Value) -> (u32, Vec<Value>) {
    let version = root
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    let items = root
        .get_mut("items")
        .map(Value::take)
        .or_else(|| root.pointer_mut("/state/items").map(Value::take));

    match items {
        Some(Value::Array(items)) => (version, items),
        Some(other) => {
            log::warn!("Search history items is not an array ({other}), starting empty");
            (version, Vec::new())
        }
        None => (version, Vec::new()),
    }
}

fn records(items: Vec<Value>, version: u32) -> Vec<StoredEntry> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match record(item) {
            Ok(record) => Some(record),
            Err(reason) => {
                log::warn!("Skipping search history record {index} (version {version}): {reason}");
                None
            }
        })
        .collect()
}

fn record(item: Value) -> Result<StoredEntry, &'static str> {
    let Value::Object(mut fields) = item else {
        return Err("not an object");
    };

    let response = fields
        .remove("response")
        .or_else(|| fields.remove("result"))
        .ok_or("no response")?;

    Ok(StoredEntry {
        response: search_result(response)?,
        created_at: fields.get("createdAt").and_then(timestamp),
        hidden: fields.get("hidden").and_then(Value::as_bool),
    })
}

/// Decodes a stored result, repairing it field by field when the strict
/// layout does not match.
///
/// Only a missing or non-integer `searchID` is fatal. Bus stops keep
/// whatever they have; crimes without coordinates are dropped.
fn search_result(value: Value) -> Result<NormalizedSearchResult, &'static str> {
    if let Ok(result) = NormalizedSearchResult::deserialize(&value) {
        return Ok(result);
    }

    let mut root = object(Some(value));
    let mut metadata = object(root.remove("metadata"));

    let search_id = metadata
        .get("searchID")
        .and_then(integer)
        .ok_or("searchID is missing or not an integer")?;
    log::debug!("Repairing stored search {search_id}");

    let postcode = postcode(&object(metadata.remove("Postcode")));

    Ok(NormalizedSearchResult {
        metadata: SearchMetadata {
            search_id,
            latitude: number(&metadata, "latitude").unwrap_or(postcode.latitude),
            longitude: number(&metadata, "longitude").unwrap_or(postcode.longitude),
            northing: text(&metadata, "Northing").unwrap_or_default(),
            easting: text(&metadata, "Easting").unwrap_or_default(),
            reverse_lookup: metadata
                .get("reverseLookup")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            postcode,
        },
        bus_stops: list(root.get("queryBusStops"), |stop| Some(bus_stop(stop))),
        crimes: list(root.get("queryCrimes"), crime),
    })
}

/// Coordinates that cannot be recovered are `NaN`, which the map treats
/// as "no position".
fn postcode(fields: &Object) -> Postcode {
    Postcode {
        postcode: text(fields, "postcode").unwrap_or_default(),
        eastings: number(fields, "eastings"),
        northings: number(fields, "northings"),
        country: text(fields, "country").unwrap_or_default(),
        longitude: number(fields, "longitude").unwrap_or(f64::NAN),
        latitude: number(fields, "latitude").unwrap_or(f64::NAN),
        region: text(fields, "region"),
        parliamentary_constituency: text(fields, "parliamentary_constituency"),
        admin_district: text(fields, "admin_district"),
        admin_ward: text(fields, "admin_ward"),
        parish: text(fields, "parish"),
        admin_county: text(fields, "admin_county"),
    }
}

fn bus_stop(fields: &Object) -> BusStop {
    BusStop {
        atco_long: text(fields, "ATCO_long").unwrap_or_default(),
        atco_short: text(fields, "ATCO_short"),
        common_name: text(fields, "CommonName"),
        street: text(fields, "Street"),
        longitude: text(fields, "Longitude"),
        latitude: text(fields, "Latitude"),
        northing: text(fields, "Northing").unwrap_or_default(),
        easting: text(fields, "Easting").unwrap_or_default(),
    }
}

fn crime(fields: &Object) -> Option<Crime> {
    Some(Crime {
        crime_id: fields.get("crimeID").and_then(integer),
        latitude: number(fields, "latitude")?,
        longitude: number(fields, "longitude")?,
        crime_category: text(fields, "crime_category"),
        crime_date: text(fields, "crime_date"),
        outcome_category: text(fields, "outcome_category"),
        outcome_date: text(fields, "outcome_date"),
    })
}

fn list<T>(value: Option<&Value>, decode: impl Fn(&Object) -> Option<T>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(decode)
            .collect(),
        _ => Vec::new(),
    }
}

fn object(value: Option<Value>) -> Object {
    match value {
        Some(Value::Object(fields)) => fields,
        _ => Object::new(),
    }
}

fn text(fields: &Object, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(fields: &Object, key: &str) -> Option<f64> {
    let value = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn integer(value: &Value) -> Option<SearchId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.trim().parse().ok().and_then(DateTime::from_timestamp_millis)),
        other => integer(other).and_then(DateTime::from_timestamp_millis),
    }
}
