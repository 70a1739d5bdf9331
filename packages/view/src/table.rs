//! History → table rows.

use chrono::{DateTime, Utc};
use postcode_map_history::HistoryEntry;
use postcode_map_search_models::{BusStop, Crime, SearchId};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::DisplayOptions;

/// One history entry as a table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: SearchId,
    pub postcode: String,
    pub lat: f64,
    pub long: f64,
    pub country: String,
    pub bus_stop_count: usize,
    pub crime_count: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub hidden: bool,
    /// Present only while bus stops are shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stops: Option<Vec<BusStop>>,
    /// Present only while crimes are shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crimes: Option<Vec<Crime>>,
}

impl TableRow {
    fn from_entry(entry: &HistoryEntry, options: DisplayOptions) -> Self {
        let result = &entry.response;
        let metadata = &result.metadata;

        Self {
            id: metadata.search_id,
            postcode: metadata.postcode.postcode.clone(),
            lat: metadata.latitude,
            long: metadata.longitude,
            country: metadata.postcode.country.clone(),
            bus_stop_count: result.bus_stops.len(),
            crime_count: result.crimes.len(),
            created_at: entry.created_at,
            hidden: entry.hidden,
            stops: options.show_all_stops.then(|| result.bus_stops.clone()),
            crimes: options.show_all_crimes.then(|| result.crimes.clone()),
        }
    }
}

/// Row order by creation time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SortOrder {
    /// Oldest first.
    #[serde(rename = "asc")]
    #[strum(serialize = "asc")]
    Ascending,
    /// Newest first.
    #[default]
    #[serde(rename = "desc")]
    #[strum(serialize = "desc")]
    Descending,
}

/// One row per entry, in cache order.
#[must_use]
pub fn to_table_rows(entries: &[HistoryEntry], options: DisplayOptions) -> Vec<TableRow> {
    entries
        .iter()
        .map(|entry| TableRow::from_entry(entry, options))
        .collect()
}

/// Re-sorts `rows` by creation time. Ties keep their current order.
pub fn sort_rows(rows: &mut [TableRow], order: SortOrder) {
    match order {
        SortOrder::Ascending => rows.sort_by_key(|r| r.created_at),
        SortOrder::Descending => rows.sort_by_key(|r| std::cmp::Reverse(r.created_at)),
    }
}
