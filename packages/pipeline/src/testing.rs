//! In-process [`SearchBackend`] for tests.
//!
//! Downstream crates enable the `test-fixtures` feature to drive the
//! pipeline end to end without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use postcode_map_backend::{BackendError, SearchBackend};
use serde_json::Value;
use tokio::sync::Notify;

/// What a stubbed endpoint answers with.
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// 2xx with this JSON body.
    Json(Value),
    /// Non-success status.
    Status(u16),
}

impl StubResponse {
    fn into_result(self, path: &str) -> Result<Value, BackendError> {
        match self {
            Self::Json(body) => Ok(body),
            Self::Status(status) => Err(BackendError::Status {
                status,
                url: format!("stub://{path}"),
            }),
        }
    }
}

/// Scriptable backend that records every call it receives.
pub struct StubBackend {
    validate: StubResponse,
    search: StubResponse,
    search_by_postcode: BTreeMap<String, StubResponse>,
    reverse: StubResponse,
    health: StubResponse,
    latency: Option<Duration>,
    gate: Option<Arc<Notify>>,
    entered: Notify,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    /// Every postcode is valid and every search answers with the `SW1A 2AA`
    /// fixture for `searchID` 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validate: StubResponse::Json(Value::Null),
            search: StubResponse::Json(postcode_map_contract::fixtures::search_response(1)),
            search_by_postcode: BTreeMap::new(),
            reverse: StubResponse::Json(postcode_map_contract::fixtures::search_response(1)),
            health: StubResponse::Json(postcode_map_contract::fixtures::health_response()),
            latency: None,
            gate: None,
            entered: Notify::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answer for `POST /postcodes/validate`.
    #[must_use]
    pub fn with_validate(mut self, response: StubResponse) -> Self {
        self.validate = response;
        self
    }

    /// Default answer for `POST /search`.
    #[must_use]
    pub fn with_search(mut self, response: StubResponse) -> Self {
        self.search = response;
        self
    }

    /// Answer for `POST /search` with one specific postcode.
    #[must_use]
    pub fn with_search_for(mut self, postcode: &str, response: StubResponse) -> Self {
        self.search_by_postcode
            .insert(postcode.to_string(), response);
        self
    }

    /// Answer for `GET /search?latitude=&longitude=`.
    #[must_use]
    pub fn with_reverse(mut self, response: StubResponse) -> Self {
        self.reverse = response;
        self
    }

    /// Answer for `GET /health`.
    #[must_use]
    pub fn with_health(mut self, response: StubResponse) -> Self {
        self.health = response;
        self
    }

    /// Sleeps this long inside every call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Holds every search call until `gate` is notified.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notified each time a search call starts.
    #[must_use]
    pub const fn entered(&self) -> &Notify {
        &self.entered
    }

    /// Calls received so far, as `"<METHOD> <path> <arg>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of calls that were in progress at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, label: String, response: StubResponse, gated: bool) -> Result<Value, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(label.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if gated {
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let path = label.split(' ').nth(1).unwrap_or_default();
        response.into_result(path)
    }
}

#[async_trait]
impl SearchBackend for StubBackend {
    async fn validate_postcode(&self, postcode: &str) -> Result<(), BackendError> {
        self.call(
            format!("POST /postcodes/validate {postcode}"),
            self.validate.clone(),
            false,
        )
        .await
        .map(|_| ())
    }

    async fn search_postcode(&self, postcode: &str) -> Result<Value, BackendError> {
        let response = self
            .search_by_postcode
            .get(postcode)
            .unwrap_or(&self.search)
            .clone();
        self.call(format!("POST /search {postcode}"), response, true)
            .await
    }

    async fn search_coordinates(&self, latitude: f64, longitude: f64) -> Result<Value, BackendError> {
        self.call(
            format!("GET /search {latitude},{longitude}"),
            self.reverse.clone(),
            true,
        )
        .await
    }

    async fn health(&self) -> Result<Value, BackendError> {
        self.call("GET /health".to_string(), self.health.clone(), false)
            .await
    }
}
