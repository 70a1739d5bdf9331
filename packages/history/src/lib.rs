#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Search history cache.
//!
//! A bounded, most-recent-first list of successful searches keyed by
//! `searchID`. Every change is written through a [`HistoryStore`] and
//! announced to subscribers. Storage problems never reach the caller: a
//! failed write is logged and the cache carries on in memory.

pub mod persist;
pub mod store;

use chrono::{DateTime, Utc};
use postcode_map_search_models::{NormalizedSearchResult, SearchId};
use serde::{Deserialize, Serialize};

pub use store::{FileStore, HistoryStore, MemoryStore, PersistenceError};

/// Number of entries kept when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 20;

/// One cached search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The normalized search result.
    #[serde(alias = "result")]
    pub response: NormalizedSearchResult,
    /// When the entry was added.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Hidden entries stay in the table but are left off the map.
    #[serde(default)]
    pub hidden: bool,
}

impl HistoryEntry {
    /// The entry's key.
    #[must_use]
    pub const fn search_id(&self) -> SearchId {
        self.response.metadata.search_id
    }
}

/// Handle returned by [`SearchHistory::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&[HistoryEntry]) + Send>;

/// The search history cache.
pub struct SearchHistory {
    items: Vec<HistoryEntry>,
    capacity: usize,
    store: Box<dyn HistoryStore>,
    persistent: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl std::fmt::Debug for SearchHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHistory")
            .field("items", &self.items.len())
            .field("capacity", &self.capacity)
            .field("persistent", &self.persistent)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl SearchHistory {
    /// Restores the history from `store`, keeping at most `capacity`
    /// entries (minimum 1).
    ///
    /// Never fails. An unreadable store or blob starts an empty history.
    #[must_use]
    pub fn load(store: Box<dyn HistoryStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);

        let items = match store.load() {
            Ok(Some(blob)) => restore(persist::decode(&blob, Utc::now()), capacity),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Could not read search history, starting empty: {e}");
                Vec::new()
            }
        };

        log::debug!("Loaded {} search history entries", items.len());

        Self {
            items,
            capacity,
            store,
            persistent: true,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// An empty history that is never written anywhere.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self::load(Box::new(MemoryStore::new()), capacity)
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn items(&self) -> &[HistoryEntry] {
        &self.items
    }

    /// The entry for `id`, if cached.
    #[must_use]
    pub fn get(&self, id: SearchId) -> Option<&HistoryEntry> {
        self.items.iter().find(|e| e.search_id() == id)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// `false` once a write has failed; later changes stay in memory.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Adds `result` as the most recent entry.
    ///
    /// Returns `false` without changing anything if an entry with the same
    /// `searchID` is already cached.
    pub fn insert(&mut self, result: NormalizedSearchResult) -> bool {
        self.insert_at(result, Utc::now())
    }

    /// [`Self::insert`] with an explicit creation time.
    pub fn insert_at(&mut self, result: NormalizedSearchResult, created_at: DateTime<Utc>) -> bool {
        let id = result.search_id();
        if self.get(id).is_some() {
            log::debug!("Search {id} already in history");
            return false;
        }

        self.items.insert(
            0,
            HistoryEntry {
                response: result,
                created_at,
                hidden: false,
            },
        );
        if self.items.len() > self.capacity
            && let Some(evicted) = self.items.pop()
        {
            log::debug!("Evicted search {} from history", evicted.search_id());
        }

        self.changed();
        true
    }

    /// Removes the entry for `id`. Returns `false` if it was not cached.
    pub fn remove(&mut self, id: SearchId) -> bool {
        let before = self.items.len();
        self.items.retain(|e| e.search_id() != id);
        let removed = self.items.len() != before;
        if removed {
            self.changed();
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.changed();
        }
    }

    /// Marks `id` hidden. Returns `false` if it was not cached or already
    /// hidden.
    pub fn hide(&mut self, id: SearchId) -> bool {
        self.set_hidden(id, true)
    }

    /// Marks `id` visible. Returns `false` if it was not cached or already
    /// visible.
    pub fn unhide(&mut self, id: SearchId) -> bool {
        self.set_hidden(id, false)
    }

    /// Marks every entry visible. Returns the number of entries that
    /// changed.
    pub fn unhide_all(&mut self) -> usize {
        let mut count = 0;
        for entry in self.items.iter_mut().filter(|e| e.hidden) {
            entry.hidden = false;
            count += 1;
        }
        if count > 0 {
            self.changed();
        }
        count
    }

    /// Calls `subscriber` with the full entry list after every change.
    pub fn subscribe(&mut self, subscriber: impl Fn(&[HistoryEntry]) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Stops notifying `id`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }

    fn set_hidden(&mut self, id: SearchId, hidden: bool) -> bool {
        let Some(entry) = self
            .items
            .iter_mut()
            .find(|e| e.search_id() == id && e.hidden != hidden)
        else {
            return false;
        };
        entry.hidden = hidden;
        self.changed();
        true
    }

    fn changed(&mut self) {
        self.persist();
        for (_, subscriber) in &self.subscribers {
            subscriber(&self.items);
        }
    }

    fn persist(&mut self) {
        if !self.persistent {
            return;
        }

        if let Err(e) = persist::encode(&self.items).and_then(|blob| self.store.save(&blob)) {
            log::warn!("Could not save search history, keeping it in memory for this session: {e}");
            self.persistent = false;
        }
    }
}

/// Collapses duplicate ids (first wins) and truncates to `capacity`.
fn restore(items: Vec<HistoryEntry>, capacity: usize) -> Vec<HistoryEntry> {
    let mut kept: Vec<HistoryEntry> = Vec::with_capacity(items.len().min(capacity));
    for entry in items {
        if kept.iter().any(|k| k.search_id() == entry.search_id()) {
            log::warn!("Dropping duplicate search {} from history", entry.search_id());
            continue;
        }
        kept.push(entry);
    }
    kept.truncate(capacity);
    kept
}
