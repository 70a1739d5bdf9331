//! The owned state a surface renders from.

use std::sync::{Arc, Mutex, PoisonError};

use postcode_map_history::{HistoryEntry, SearchHistory, SubscriptionId};
use postcode_map_pipeline::Submission;
use postcode_map_search_models::SearchId;

use crate::map::{LatLng, MapMarker, MapState, Viewport, to_map_markers};
use crate::table::{SortOrder, TableRow, sort_rows, to_table_rows};
use crate::DisplayOptions;

#[derive(Debug, Default)]
struct RowCache {
    options: DisplayOptions,
    rows: Vec<TableRow>,
}

/// History, map and display toggles, kept consistent with each other.
///
/// Table rows are re-projected by a history subscription, so every cache
/// mutation (including capacity eviction) is reflected without the caller
/// asking.
pub struct Explorer {
    history: SearchHistory,
    map: MapState,
    rows: Arc<Mutex<RowCache>>,
    subscription: SubscriptionId,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("history", &self.history)
            .field("map", &self.map)
            .finish_non_exhaustive()
    }
}

impl Explorer {
    #[must_use]
    pub fn new(mut history: SearchHistory) -> Self {
        let rows = Arc::new(Mutex::new(RowCache {
            options: DisplayOptions::default(),
            rows: to_table_rows(history.items(), DisplayOptions::default()),
        }));

        let cache = Arc::clone(&rows);
        let subscription = history.subscribe(move |items: &[HistoryEntry]| {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.rows = to_table_rows(items, cache.options);
        });

        Self {
            history,
            map: MapState::default(),
            rows,
            subscription,
        }
    }

    #[must_use]
    pub const fn history(&self) -> &SearchHistory {
        &self.history
    }

    #[must_use]
    pub const fn map(&self) -> &MapState {
        &self.map
    }

    #[must_use]
    pub fn options(&self) -> DisplayOptions {
        self.cache().options
    }

    /// Records a finished submission. Successful results are cached and
    /// selected; failures leave everything untouched.
    ///
    /// Returns `true` if a new history entry was added.
    pub fn apply(&mut self, submission: &Submission) -> bool {
        let Ok(result) = &submission.outcome else {
            return false;
        };

        let inserted = self.history.insert(result.clone());
        self.map.on_search(result.search_id(), LatLng::from(result));
        inserted
    }

    /// Removes `id` from the history and the selection.
    pub fn remove(&mut self, id: SearchId) -> bool {
        self.map.forget(id);
        self.history.remove(id)
    }

    /// Empties the history.
    pub fn clear(&mut self) {
        self.map.clear_selection();
        self.history.clear();
    }

    pub fn hide(&mut self, id: SearchId) -> bool {
        self.history.hide(id)
    }

    pub fn unhide(&mut self, id: SearchId) -> bool {
        self.history.unhide(id)
    }

    pub fn unhide_all(&mut self) -> usize {
        self.history.unhide_all()
    }

    /// Records a user pan/zoom.
    pub const fn set_viewport(&mut self, viewport: Viewport) {
        self.map.set_viewport(viewport);
    }

    /// Selects and recentres on `id`. Returns `false` if it is not cached.
    pub fn focus(&mut self, id: SearchId) -> bool {
        let Some(entry) = self.history.get(id) else {
            return false;
        };
        self.map.focus(id, LatLng::from(&entry.response));
        true
    }

    /// Changes the display toggles and re-projects the rows.
    pub fn set_options(&mut self, options: DisplayOptions) {
        let mut cache = self.cache();
        cache.options = options;
        cache.rows = to_table_rows(self.history.items(), options);
    }

    /// Table rows in the requested order.
    #[must_use]
    pub fn table_rows(&self, order: SortOrder) -> Vec<TableRow> {
        let mut rows = self.cache().rows.clone();
        sort_rows(&mut rows, order);
        rows
    }

    /// Markers for the current selection and toggles.
    #[must_use]
    pub fn markers(&self) -> Vec<MapMarker> {
        to_map_markers(self.history.items(), self.map.selected(), self.options())
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, RowCache> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Explorer {
    fn drop(&mut self) {
        self.history.unsubscribe(self.subscription);
    }
}
