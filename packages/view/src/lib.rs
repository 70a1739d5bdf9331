#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! View state derived from the search history.
//!
//! Everything here is a projection: table rows and map markers are
//! recomputed from [`postcode_map_history::SearchHistory`] and never stored
//! on their own. [`Explorer`] ties the history, the map viewport and the
//! display toggles together for a surface to render.

pub mod explorer;
pub mod format;
pub mod map;
pub mod table;

use serde::{Deserialize, Serialize};

pub use explorer::Explorer;
pub use format::{format_timestamp, format_uptime};
pub use map::{LatLng, MapMarker, MapState, MarkerKind, Viewport, to_map_markers};
pub use table::{SortOrder, TableRow, sort_rows, to_table_rows};

/// Whether bus stops and crimes of every visible search are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub show_all_stops: bool,
    pub show_all_crimes: bool,
}

impl DisplayOptions {
    /// Flips [`Self::show_all_stops`].
    #[must_use]
    pub const fn toggle_stops(self) -> Self {
        Self {
            show_all_stops: !self.show_all_stops,
            ..self
        }
    }

    /// Flips [`Self::show_all_crimes`].
    #[must_use]
    pub const fn toggle_crimes(self) -> Self {
        Self {
            show_all_crimes: !self.show_all_crimes,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_flip_one_flag() {
        let options = DisplayOptions::default().toggle_stops();
        assert!(options.show_all_stops);
        assert!(!options.show_all_crimes);
        assert_eq!(options.toggle_stops(), DisplayOptions::default());
        assert!(options.toggle_crimes().show_all_crimes);
    }

    #[test]
    fn options_use_camel_case() {
        let json = serde_json::to_value(DisplayOptions {
            show_all_stops: true,
            show_all_crimes: false,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "showAllStops": true, "showAllCrimes": false }));
    }
}
