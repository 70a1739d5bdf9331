//! Map viewport and markers.

use postcode_map_history::HistoryEntry;
use postcode_map_search_models::{NormalizedSearchResult, SearchId};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::DisplayOptions;

/// Centre used before anything has been searched.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 51.505,
    lng: -0.09,
};

/// Zoom used before anything has been searched.
pub const DEFAULT_ZOOM: u8 = 13;

/// Highest zoom level tile servers provide.
pub const MAX_ZOOM: u8 = 22;

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// `true` if both values are finite and in range.
    #[must_use]
    pub fn is_valid(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<&NormalizedSearchResult> for LatLng {
    fn from(result: &NormalizedSearchResult) -> Self {
        Self {
            lat: result.metadata.latitude,
            lng: result.metadata.longitude,
        }
    }
}

/// What the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Viewport plus the selection and whether the user has moved the map.
///
/// New searches recentre the map only until the user pans or zooms.
/// After that, only [`MapState::focus`] moves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    viewport: Viewport,
    manual: bool,
    selected: Option<SearchId>,
}

impl MapState {
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// `true` once the user has panned or zoomed.
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        self.manual
    }

    #[must_use]
    pub const fn selected(&self) -> Option<SearchId> {
        self.selected
    }

    /// Records a user pan/zoom.
    pub const fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.manual = true;
    }

    /// Selects a new search result and recentres on it unless the user
    /// has moved the map or the result has no usable position.
    pub fn on_search(&mut self, id: SearchId, position: LatLng) {
        self.selected = Some(id);
        if self.manual {
            log::debug!("Keeping manual viewport for search {id}");
        } else if position.is_valid() {
            self.viewport.center = position;
        } else {
            log::debug!("Search {id} has no usable position, keeping centre");
        }
    }

    /// Selects `id` and recentres on it regardless of manual movement.
    pub fn focus(&mut self, id: SearchId, position: LatLng) {
        self.selected = Some(id);
        if position.is_valid() {
            self.viewport.center = position;
        }
        self.manual = false;
    }

    /// Drops the selection if it points at `id`.
    pub fn forget(&mut self, id: SearchId) {
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    /// Drops the selection.
    pub const fn clear_selection(&mut self) {
        self.selected = None;
    }
}

/// What a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkerKind {
    Search,
    BusStop,
    Crime,
}

/// A pin on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub kind: MarkerKind,
    pub search_id: SearchId,
    pub position: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

/// Markers for the selected (or most recent visible) entry, plus bus
/// stops and crimes of every visible entry when those toggles are on.
///
/// Hidden entries contribute nothing. Markers without a usable position
/// (an unparseable bus stop, a repaired history entry) are left out.
#[must_use]
pub fn to_map_markers(
    entries: &[HistoryEntry],
    selected: Option<SearchId>,
    options: DisplayOptions,
) -> Vec<MapMarker> {
    let visible = || entries.iter().filter(|e| !e.hidden);

    let primary = selected
        .and_then(|id| visible().find(|e| e.search_id() == id))
        .or_else(|| visible().next());

    let mut markers: Vec<MapMarker> = primary
        .map(|entry| MapMarker {
            kind: MarkerKind::Search,
            search_id: entry.search_id(),
            position: LatLng::from(&entry.response),
            popup: Some(entry.response.postcode().to_string()),
        })
        .filter(|marker| marker.position.is_valid())
        .into_iter()
        .collect();

    if options.show_all_stops {
        markers.extend(visible().flat_map(|entry| {
            entry.response.bus_stops.iter().filter_map(move |stop| {
                let (lat, lng) = stop.coordinates()?;
                Some(MapMarker {
                    kind: MarkerKind::BusStop,
                    search_id: entry.search_id(),
                    position: LatLng { lat, lng },
                    popup: Some(stop.label().to_string()),
                })
            })
        }));
    }

    if options.show_all_crimes {
        markers.extend(visible().flat_map(|entry| {
            entry.response.crimes.iter().map(move |crime| MapMarker {
                kind: MarkerKind::Crime,
                search_id: entry.search_id(),
                position: LatLng {
                    lat: crime.latitude,
                    lng: crime.longitude,
                },
                popup: crime.crime_category.clone(),
            })
        }));
    }

    markers
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use postcode_map_contract::{fixtures, parse_search_response};

    use super::*;

    fn entry(id: i64, lat: f64, hidden: bool) -> HistoryEntry {
        let mut raw = fixtures::search_response(id);
        raw["latitude"] = serde_json::json!(lat);
        raw["queryBusStops"][1]["Latitude"] = serde_json::json!("not a number");
        HistoryEntry {
            response: parse_search_response(&raw).unwrap(),
            created_at: DateTime::from_timestamp_millis(id).unwrap(),
            hidden,
        }
    }

    #[test]
    fn default_viewport_is_central_london() {
        let state = MapState::default();
        assert_eq!(state.viewport().center, DEFAULT_CENTER);
        assert_eq!(state.viewport().zoom, 13);
        assert!(!state.is_manual());
    }

    #[test]
    fn search_recentres_until_user_moves_the_map() {
        let mut state = MapState::default();
        state.on_search(1, LatLng { lat: 52.0, lng: -1.0 });
        assert_eq!(state.viewport().center, LatLng { lat: 52.0, lng: -1.0 });

        let manual = Viewport {
            center: LatLng { lat: 50.0, lng: -4.0 },
            zoom: 9,
        };
        state.set_viewport(manual);
        state.on_search(2, LatLng { lat: 53.0, lng: -2.0 });
        assert_eq!(state.viewport(), manual);
        assert_eq!(state.selected(), Some(2));
    }

    #[test]
    fn unusable_position_keeps_centre() {
        let mut state = MapState::default();
        let nowhere = LatLng {
            lat: f64::NAN,
            lng: f64::NAN,
        };

        state.on_search(1, nowhere);
        assert_eq!(state.viewport().center, DEFAULT_CENTER);
        state.focus(1, nowhere);
        assert_eq!(state.viewport().center, DEFAULT_CENTER);
        assert_eq!(state.selected(), Some(1));
    }

    #[test]
    fn entry_without_position_has_no_search_marker() {
        let mut lost = entry(5, 51.5, false);
        lost.response.metadata.latitude = f64::NAN;

        let markers = to_map_markers(&[lost], None, DisplayOptions::default());
        assert!(markers.is_empty());
    }

    #[test]
    fn focus_overrides_manual_viewport() {
        let mut state = MapState::default();
        state.set_viewport(Viewport {
            center: LatLng { lat: 50.0, lng: -4.0 },
            zoom: 9,
        });

        state.focus(7, LatLng { lat: 51.0, lng: 0.0 });
        assert_eq!(state.viewport().center, LatLng { lat: 51.0, lng: 0.0 });
        assert_eq!(state.viewport().zoom, 9);
        assert!(!state.is_manual());

        state.on_search(8, LatLng { lat: 55.0, lng: -3.0 });
        assert_eq!(state.viewport().center, LatLng { lat: 55.0, lng: -3.0 });
    }

    #[test]
    fn forget_only_clears_matching_selection() {
        let mut state = MapState::default();
        state.on_search(1, DEFAULT_CENTER);
        state.forget(2);
        assert_eq!(state.selected(), Some(1));
        state.forget(1);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn one_marker_for_most_recent_visible_entry() {
        let entries = [entry(3, 53.0, true), entry(2, 52.0, false), entry(1, 51.0, false)];

        let markers = to_map_markers(&entries, None, DisplayOptions::default());

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].search_id, 2);
        assert_eq!(markers[0].kind, MarkerKind::Search);
        assert_eq!(markers[0].popup.as_deref(), Some("SW1A 2AA"));
        assert!((markers[0].position.lat - 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn selection_wins_unless_hidden() {
        let entries = [entry(3, 53.0, false), entry(2, 52.0, true), entry(1, 51.0, false)];

        let markers = to_map_markers(&entries, Some(1), DisplayOptions::default());
        assert_eq!(markers[0].search_id, 1);

        let markers = to_map_markers(&entries, Some(2), DisplayOptions::default());
        assert_eq!(markers[0].search_id, 3);
    }

    #[test]
    fn toggles_add_stop_and_crime_markers() {
        let entries = [entry(2, 52.0, false), entry(1, 51.0, true)];
        let options = DisplayOptions {
            show_all_stops: true,
            show_all_crimes: true,
        };

        let markers = to_map_markers(&entries, None, options);

        let count = |kind| markers.iter().filter(|m| m.kind == kind).count();
        assert_eq!(count(MarkerKind::Search), 1);
        assert_eq!(count(MarkerKind::BusStop), 1);
        assert_eq!(count(MarkerKind::Crime), 2);
        assert!(markers.iter().all(|m| m.search_id == 2));
    }

    #[test]
    fn empty_history_has_no_markers() {
        assert!(to_map_markers(&[], Some(1), DisplayOptions::default()).is_empty());
    }
}
