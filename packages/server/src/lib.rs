#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the postcode map.
//!
//! Exposes the search pipeline, the search history and the derived table
//! and map state as a JSON API under `/api`. One [`AppState`] is shared by
//! every worker: the pipeline serializes searches and the explorer sits
//! behind a mutex that is only taken after the network phase of a search.

mod handlers;
pub mod interactive;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use postcode_map_backend::{HttpBackend, SearchBackend};
use postcode_map_config::AppConfig;
use postcode_map_history::{FileStore, SearchHistory};
use postcode_map_pipeline::SearchPipeline;
use postcode_map_view::Explorer;

/// Shared application state.
pub struct AppState {
    /// Runs searches against the backend, one at a time.
    pub pipeline: SearchPipeline,
    /// History, map and display toggles.
    pub explorer: Mutex<Explorer>,
}

impl AppState {
    /// State over `backend` with the given history.
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, history: SearchHistory) -> Self {
        Self {
            pipeline: SearchPipeline::new(backend),
            explorer: Mutex::new(Explorer::new(history)),
        }
    }

    /// Locks the explorer.
    pub fn explorer(&self) -> MutexGuard<'_, Explorer> {
        self.explorer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/status", web::get().to(handlers::status))
            .route("/search", web::post().to(handlers::search))
            .route("/search", web::get().to(handlers::search_coordinates))
            .route("/history", web::get().to(handlers::history))
            .route("/history", web::delete().to(handlers::clear_history))
            .route("/history/unhide-all", web::post().to(handlers::unhide_all))
            .route("/history/{id}", web::delete().to(handlers::remove_entry))
            .route("/history/{id}/hide", web::post().to(handlers::hide_entry))
            .route("/history/{id}/unhide", web::post().to(handlers::unhide_entry))
            .route("/table", web::get().to(handlers::table))
            .route("/map", web::get().to(handlers::map))
            .route("/map/viewport", web::put().to(handlers::set_viewport))
            .route("/map/focus/{id}", web::post().to(handlers::focus))
            .route("/display", web::put().to(handlers::set_display)),
    );
}

/// Builds the shared state from `config`: an HTTP backend client and the
/// file-backed history.
///
/// # Errors
///
/// Returns an error if the backend URL is unusable or the HTTP client
/// cannot be built.
pub fn build_state(config: &AppConfig) -> std::io::Result<AppState> {
    let backend =
        HttpBackend::new(&config.backend.base_url, config.timeout()).map_err(std::io::Error::other)?;
    log::info!(
        "Using backend {} (timeout {}s)",
        backend.base_url(),
        config.backend.timeout_secs
    );

    let history = SearchHistory::load(
        Box::new(FileStore::new(&config.history.path)),
        config.history.capacity,
    );
    log::info!(
        "Loaded {} search(es) from {}",
        history.len(),
        config.history.path.display()
    );

    Ok(AppState::new(Arc::new(backend), history))
}

/// Starts the postcode map API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. `#[actix_web::main]`, or [`run_server_blocking`]).
///
/// # Errors
///
/// Returns an error if the state cannot be built, or the HTTP server
/// fails to bind or encounters a runtime error.
pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let state = web::Data::new(build_state(&config)?);

    let bind_addr = config.server.bind_addr.clone();
    let port = config.server.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Runs [`run_server`] on a fresh actix system, blocking the calling
/// thread until the server stops.
///
/// # Errors
///
/// See [`run_server`].
pub fn run_server_blocking(config: AppConfig) -> std::io::Result<()> {
    actix_rt::System::new().block_on(run_server(config))
}
