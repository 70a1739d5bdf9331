//! One CLI session: the search pipeline plus the persisted explorer state.

use std::sync::Arc;

use postcode_map_backend::{BackendError, HttpBackend, SearchBackend};
use postcode_map_cli_utils::{MultiProgress, SpinnerProgress};
use postcode_map_config::AppConfig;
use postcode_map_history::{FileStore, SearchHistory};
use postcode_map_pipeline::status::check_health;
use postcode_map_pipeline::{SearchPipeline, Submission};
use postcode_map_search_models::SearchId;
use postcode_map_view::{DisplayOptions, Explorer, SortOrder};

use crate::render;

pub struct Session {
    pipeline: SearchPipeline,
    explorer: Explorer,
    multi: MultiProgress,
}

impl Session {
    /// Opens a session against the configured backend and history file.
    pub fn open(config: &AppConfig, multi: MultiProgress) -> Result<Self, BackendError> {
        let backend = HttpBackend::new(&config.backend.base_url, config.timeout())?;
        log::debug!("Using backend {}", backend.base_url());

        let history = SearchHistory::load(
            Box::new(FileStore::new(&config.history.path)),
            config.history.capacity,
        );

        Ok(Self::with_backend(Arc::new(backend), history, multi))
    }

    pub fn with_backend(
        backend: Arc<dyn SearchBackend>,
        history: SearchHistory,
        multi: MultiProgress,
    ) -> Self {
        Self {
            pipeline: SearchPipeline::new(backend),
            explorer: Explorer::new(history),
            multi,
        }
    }

    pub const fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// Searches for `postcode`, prints the outcome and records a success.
    /// Returns `true` on success.
    pub async fn search(&mut self, postcode: &str) -> bool {
        let progress = SpinnerProgress::new(&self.multi, &format!("Searching for {postcode}..."));
        let submission = self.pipeline.submit(postcode, &progress).await;
        self.finish(&submission)
    }

    /// Reverse lookup by coordinates. Returns `true` on success.
    pub async fn locate(&mut self, latitude: f64, longitude: f64) -> bool {
        let progress = SpinnerProgress::new(
            &self.multi,
            &format!("Looking up {latitude}, {longitude}..."),
        );
        let submission = self
            .pipeline
            .submit_coordinates(latitude, longitude, &progress)
            .await;
        self.finish(&submission)
    }

    fn finish(&mut self, submission: &Submission) -> bool {
        println!("{}", render::submission(submission));
        self.explorer.apply(submission);
        submission.is_success()
    }

    /// Prints the backend health. Returns `true` when the backend answered
    /// with a valid health document.
    pub async fn status(&self) -> bool {
        match check_health(self.pipeline.backend().as_ref()).await {
            Ok(health) => {
                println!("{}", render::health(&health));
                true
            }
            Err(e) => {
                println!("{}", render::status_error(&e));
                false
            }
        }
    }

    pub fn history(&self) -> String {
        render::history(self.explorer.history().items())
    }

    pub fn remove(&mut self, id: SearchId) -> bool {
        self.explorer.remove(id)
    }

    pub fn clear(&mut self) {
        self.explorer.clear();
    }

    pub fn hide(&mut self, id: SearchId) -> bool {
        self.explorer.hide(id)
    }

    pub fn unhide(&mut self, id: SearchId) -> bool {
        self.explorer.unhide(id)
    }

    pub fn unhide_all(&mut self) -> usize {
        self.explorer.unhide_all()
    }

    pub fn toggle_stops(&mut self) -> DisplayOptions {
        let options = self.explorer.options().toggle_stops();
        self.explorer.set_options(options);
        options
    }

    pub fn toggle_crimes(&mut self) -> DisplayOptions {
        let options = self.explorer.options().toggle_crimes();
        self.explorer.set_options(options);
        options
    }

    pub fn table(&mut self, options: DisplayOptions, order: SortOrder) -> String {
        self.explorer.set_options(options);
        render::table(&self.explorer.table_rows(order))
    }

    /// Centres the map on the most recent visible search (unless the view
    /// was moved by hand) and renders the viewport and markers.
    pub fn map(&mut self) -> String {
        if !self.explorer.map().is_manual() && self.explorer.map().selected().is_none() {
            let latest = self
                .explorer
                .history()
                .items()
                .iter()
                .find(|entry| !entry.hidden)
                .map(postcode_map_history::HistoryEntry::search_id);
            if let Some(id) = latest {
                self.explorer.focus(id);
            }
        }

        render::map(self.explorer.map(), &self.explorer.markers())
    }
}
