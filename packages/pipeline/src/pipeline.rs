//! The submission state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use postcode_map_backend::SearchBackend;
use postcode_map_contract::parse_search_response;
use postcode_map_search_models::NormalizedSearchResult;

use crate::postcode::{check_coordinates, parse_postcode};
use crate::{PipelineBusy, SearchError, SearchProgress, Submission, SubmissionState};

/// Runs postcode searches against one backend, one at a time.
pub struct SearchPipeline {
    backend: Arc<dyn SearchBackend>,
    gate: tokio::sync::Mutex<()>,
    pending: AtomicBool,
    state: Mutex<SubmissionState>,
}

/// Clears the pending flag when a submission finishes or is dropped
/// mid-flight.
struct PendingGuard<'a> {
    pipeline: &'a SearchPipeline,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .pipeline
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.is_pending() {
            log::warn!("Submission cancelled while {state}");
            *state = SubmissionState::Failed;
        }
        drop(state);
        self.pipeline.pending.store(false, Ordering::SeqCst);
    }
}

impl SearchPipeline {
    /// Creates an idle pipeline over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            gate: tokio::sync::Mutex::new(()),
            pending: AtomicBool::new(false),
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    /// The backend this pipeline talks to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    /// `true` while a submission is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// The most recent state.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Searches for `raw`, waiting for any in-flight submission first.
    pub async fn submit(&self, raw: &str, progress: &dyn SearchProgress) -> Submission {
        let _permit = self.gate.lock().await;
        self.run_postcode(raw, progress).await
    }

    /// Searches for `raw` unless another submission is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBusy`] if a submission is already running.
    pub async fn try_submit(
        &self,
        raw: &str,
        progress: &dyn SearchProgress,
    ) -> Result<Submission, PipelineBusy> {
        let _permit = self.gate.try_lock().map_err(|_| PipelineBusy)?;
        Ok(self.run_postcode(raw, progress).await)
    }

    /// Reverse lookup by coordinates, waiting for any in-flight
    /// submission first.
    pub async fn submit_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        progress: &dyn SearchProgress,
    ) -> Submission {
        let _permit = self.gate.lock().await;
        self.run_coordinates(latitude, longitude, progress).await
    }

    /// Reverse lookup unless another submission is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBusy`] if a submission is already running.
    pub async fn try_submit_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        progress: &dyn SearchProgress,
    ) -> Result<Submission, PipelineBusy> {
        let _permit = self.gate.try_lock().map_err(|_| PipelineBusy)?;
        Ok(self.run_coordinates(latitude, longitude, progress).await)
    }

    async fn run_postcode(&self, raw: &str, progress: &dyn SearchProgress) -> Submission {
        let _pending = self.begin();
        let outcome = self.postcode_outcome(raw, progress).await;
        self.finish(&outcome, progress);

        Submission {
            entered_postcode: raw.to_string(),
            outcome,
        }
    }

    async fn run_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        progress: &dyn SearchProgress,
    ) -> Submission {
        let _pending = self.begin();
        let outcome = self
            .coordinates_outcome(latitude, longitude, progress)
            .await;
        self.finish(&outcome, progress);

        Submission {
            entered_postcode: format!("{latitude}, {longitude}"),
            outcome,
        }
    }

    async fn postcode_outcome(
        &self,
        raw: &str,
        progress: &dyn SearchProgress,
    ) -> Result<NormalizedSearchResult, SearchError> {
        self.advance(SubmissionState::Validating, progress);
        let postcode = parse_postcode(raw)?;

        self.advance(SubmissionState::CheckingPostcode, progress);
        if let Err(source) = self.backend.validate_postcode(&postcode).await {
            return Err(SearchError::UnknownPostcode { postcode, source });
        }

        self.advance(SubmissionState::Searching, progress);
        let body = self
            .backend
            .search_postcode(&postcode)
            .await
            .map_err(SearchError::Backend)?;

        self.advance(SubmissionState::Normalizing, progress);
        parse_search_response(&body).map_err(SearchError::Schema)
    }

    async fn coordinates_outcome(
        &self,
        latitude: f64,
        longitude: f64,
        progress: &dyn SearchProgress,
    ) -> Result<NormalizedSearchResult, SearchError> {
        self.advance(SubmissionState::Validating, progress);
        check_coordinates(latitude, longitude)?;

        self.advance(SubmissionState::Searching, progress);
        let body = self
            .backend
            .search_coordinates(latitude, longitude)
            .await
            .map_err(SearchError::Backend)?;

        self.advance(SubmissionState::Normalizing, progress);
        parse_search_response(&body).map_err(SearchError::Schema)
    }

    fn begin(&self) -> PendingGuard<'_> {
        self.pending.store(true, Ordering::SeqCst);
        PendingGuard { pipeline: self }
    }

    fn finish(
        &self,
        outcome: &Result<NormalizedSearchResult, SearchError>,
        progress: &dyn SearchProgress,
    ) {
        match outcome {
            Ok(result) => {
                log::info!(
                    "Search {} for {} returned {} bus stop(s) and {} crime(s)",
                    result.search_id(),
                    result.postcode(),
                    result.bus_stops.len(),
                    result.crimes.len()
                );
                self.advance(SubmissionState::Success, progress);
            }
            Err(e) => {
                log::warn!("Search failed ({}): {e}", e.kind());
                self.advance(SubmissionState::Failed, progress);
            }
        }
    }

    fn advance(&self, next: SubmissionState, progress: &dyn SearchProgress) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_advance_to(next) {
            log::warn!("Unexpected submission transition {state} -> {next}");
        }
        log::debug!("Submission {state} -> {next}");
        *state = next;
        drop(state);

        progress.on_transition(next);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{StubBackend, StubResponse};
    use crate::{NullProgress, SearchErrorKind};
    use postcode_map_contract::fixtures;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<SubmissionState>>);

    impl SearchProgress for Recorder {
        fn on_transition(&self, state: SubmissionState) {
            self.0.lock().unwrap().push(state);
        }
    }

    impl Recorder {
        fn states(&self) -> Vec<SubmissionState> {
            self.0.lock().unwrap().clone()
        }
    }

    fn pipeline(backend: StubBackend) -> (Arc<StubBackend>, SearchPipeline) {
        let backend = Arc::new(backend);
        let pipeline = SearchPipeline::new(backend.clone());
        (backend, pipeline)
    }

    #[tokio::test]
    async fn successful_search_walks_every_state() {
        let (backend, pipeline) =
            pipeline(StubBackend::new().with_search(StubResponse::Json(fixtures::search_response(42))));
        let recorder = Recorder::default();

        let submission = pipeline.submit(" sw1a 2aa", &recorder).await;

        assert!(submission.is_success());
        assert_eq!(submission.entered_postcode, " sw1a 2aa");
        assert_eq!(submission.result().unwrap().search_id(), 42);
        assert_eq!(
            recorder.states(),
            vec![
                SubmissionState::Validating,
                SubmissionState::CheckingPostcode,
                SubmissionState::Searching,
                SubmissionState::Normalizing,
                SubmissionState::Success,
            ]
        );
        assert_eq!(
            backend.calls(),
            vec!["POST /postcodes/validate SW1A 2AA", "POST /search SW1A 2AA"]
        );
        assert_eq!(pipeline.state(), SubmissionState::Success);
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn malformed_postcode_never_reaches_the_backend() {
        let (backend, pipeline) = pipeline(StubBackend::new());
        let recorder = Recorder::default();

        let submission = pipeline.submit("1234", &recorder).await;

        let err = submission.error().unwrap();
        assert_eq!(err.kind(), SearchErrorKind::Format);
        assert_eq!(err.user_message(), "Invalid UK postcode format");
        assert!(backend.calls().is_empty());
        assert_eq!(
            recorder.states(),
            vec![SubmissionState::Validating, SubmissionState::Failed]
        );
    }

    #[tokio::test]
    async fn unknown_postcode_stops_before_search() {
        let (backend, pipeline) =
            pipeline(StubBackend::new().with_validate(StubResponse::Status(404)));

        let submission = pipeline.submit("ZZ9 9ZZ", &NullProgress).await;

        match submission.error().unwrap() {
            SearchError::UnknownPostcode { postcode, source } => {
                assert_eq!(postcode, "ZZ9 9ZZ");
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected {other}"),
        }
        assert_eq!(backend.calls(), vec!["POST /postcodes/validate ZZ9 9ZZ"]);
    }

    #[tokio::test]
    async fn server_error_is_a_retryable_backend_error() {
        let (_, pipeline) = pipeline(StubBackend::new().with_search(StubResponse::Status(500)));

        let submission = pipeline.submit("GL1 1LB", &NullProgress).await;

        let err = submission.error().unwrap();
        assert_eq!(err.kind(), SearchErrorKind::Backend);
        assert!(err.is_retryable());
        assert!(err.issues().is_none());
        assert_eq!(pipeline.state(), SubmissionState::Failed);
    }

    #[tokio::test]
    async fn contract_drift_is_a_schema_error_with_issues() {
        let mut body = fixtures::search_response(9);
        body["latitude"] = json!("51.5");
        body["queryCrimes"][0].as_object_mut().unwrap().remove("latitude");
        let (_, pipeline) = pipeline(StubBackend::new().with_search(StubResponse::Json(body)));
        let recorder = Recorder::default();

        let submission = pipeline.submit("SW1A 2AA", &recorder).await;

        let issues = submission.error().unwrap().issues().unwrap();
        assert_eq!(
            issues,
            vec![
                "latitude: Expected number, received string",
                "queryCrimes[0].latitude: Required (number)",
            ]
        );
        assert_eq!(
            recorder.states().last(),
            Some(&SubmissionState::Failed)
        );
        assert!(recorder.states().contains(&SubmissionState::Normalizing));
    }

    #[tokio::test]
    async fn reverse_lookup_skips_postcode_check() {
        let (backend, pipeline) = pipeline(StubBackend::new());
        let recorder = Recorder::default();

        let submission = pipeline
            .submit_coordinates(51.503_54, -0.127_695, &recorder)
            .await;

        assert!(submission.is_success());
        assert_eq!(submission.entered_postcode, "51.50354, -0.127695");
        assert_eq!(backend.calls(), vec!["GET /search 51.50354,-0.127695"]);
        assert_eq!(
            recorder.states(),
            vec![
                SubmissionState::Validating,
                SubmissionState::Searching,
                SubmissionState::Normalizing,
                SubmissionState::Success,
            ]
        );
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_a_format_error() {
        let (backend, pipeline) = pipeline(StubBackend::new());

        let submission = pipeline.submit_coordinates(95.0, 0.0, &NullProgress).await;

        assert_eq!(submission.error().unwrap().kind(), SearchErrorKind::Format);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn try_submit_refuses_while_pending() {
        let gate = Arc::new(Notify::new());
        let (backend, pipeline) = pipeline(StubBackend::new().with_gate(gate.clone()));

        let first = pipeline.submit("SW1A 2AA", &NullProgress);
        let second = async {
            backend.entered().notified().await;
            assert!(pipeline.is_pending());
            assert_eq!(pipeline.state(), SubmissionState::Searching);
            let refused = pipeline.try_submit("GL1 1LB", &NullProgress).await;
            let refused_coords = pipeline
                .try_submit_coordinates(51.0, 0.0, &NullProgress)
                .await;
            gate.notify_one();
            (refused, refused_coords)
        };

        let (first, (refused, refused_coords)) = tokio::join!(first, second);

        assert!(first.is_success());
        assert_eq!(refused.unwrap_err(), PipelineBusy);
        assert_eq!(refused_coords.unwrap_err(), PipelineBusy);
        assert!(!pipeline.is_pending());
        assert_eq!(
            backend.calls(),
            vec!["POST /postcodes/validate SW1A 2AA", "POST /search SW1A 2AA"]
        );
    }

    #[tokio::test]
    async fn queued_submissions_run_one_at_a_time() {
        let (backend, pipeline) =
            pipeline(StubBackend::new().with_latency(Duration::from_millis(5)));

        let (a, b, c) = tokio::join!(
            pipeline.submit("SW1A 2AA", &NullProgress),
            pipeline.submit("GL1 1LB", &NullProgress),
            pipeline.submit_coordinates(51.5, -0.1, &NullProgress),
        );

        assert!(a.is_success() && b.is_success() && c.is_success());
        assert_eq!(backend.max_in_flight(), 1);
        assert_eq!(backend.calls().len(), 5);
    }

    #[tokio::test]
    async fn dropped_submission_clears_pending() {
        let gate = Arc::new(Notify::new());
        let (backend, pipeline) = pipeline(StubBackend::new().with_gate(gate));

        tokio::select! {
            _ = pipeline.submit("SW1A 2AA", &NullProgress) => panic!("gate was never opened"),
            () = backend.entered().notified() => {}
        }

        assert!(!pipeline.is_pending());
        assert_eq!(pipeline.state(), SubmissionState::Failed);
        assert!(pipeline.try_submit("1234", &NullProgress).await.is_ok());
    }
}
