//! HTTP handler functions for the postcode map API.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use postcode_map_pipeline::status::{StatusError, check_health};
use postcode_map_pipeline::{NullProgress, SearchErrorKind, Submission};
use postcode_map_search_models::SearchId;
use postcode_map_server_models::{
    ApiChanged, ApiError, ApiHealth, ApiMap, ApiSearchResponse, ApiStatus, ApiStatusError,
    CoordinateQuery, SearchRequest, TableQuery,
};
use postcode_map_view::map::MAX_ZOOM;
use postcode_map_view::{DisplayOptions, Viewport, format_timestamp, format_uptime};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/status`
///
/// Checks the backend `/health` endpoint against its contract.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    match check_health(state.pipeline.backend().as_ref()).await {
        Ok(health) => HttpResponse::Ok().json(ApiStatus {
            success: true,
            uptime: Some(format_uptime(health.uptime)),
            checked_at: Some(format_timestamp(&health.timestamp)),
            data: Some(health),
            error: None,
        }),
        Err(e) => {
            log::warn!("Backend status check failed: {e}");
            let error = match &e {
                StatusError::Unavailable(_) => ApiStatusError {
                    msg: "Failed to fetch health".to_string(),
                    issues: None,
                },
                StatusError::Schema(v) => ApiStatusError {
                    msg: v.message.clone(),
                    issues: Some(v.rendered_issues()),
                },
            };
            HttpResponse::BadGateway().json(ApiStatus {
                success: false,
                data: None,
                uptime: None,
                checked_at: None,
                error: Some(error),
            })
        }
    }
}

/// `POST /api/search`
///
/// Runs a postcode search and records a successful result. Refused with
/// `409 Conflict` while another search is in flight.
pub async fn search(state: web::Data<AppState>, body: web::Json<SearchRequest>) -> HttpResponse {
    let SearchRequest { postcode } = body.into_inner();

    match state.pipeline.try_submit(&postcode, &NullProgress).await {
        Ok(submission) => record(&state, submission),
        Err(busy) => {
            log::debug!("Refusing search for {postcode}: {busy}");
            HttpResponse::Conflict().json(ApiSearchResponse::busy(postcode))
        }
    }
}

/// `GET /api/search?latitude=&longitude=`
///
/// Reverse lookup by coordinates.
pub async fn search_coordinates(
    state: web::Data<AppState>,
    query: web::Query<CoordinateQuery>,
) -> HttpResponse {
    let CoordinateQuery {
        latitude,
        longitude,
    } = query.into_inner();

    match state
        .pipeline
        .try_submit_coordinates(latitude, longitude, &NullProgress)
        .await
    {
        Ok(submission) => record(&state, submission),
        Err(_) => HttpResponse::Conflict().json(ApiSearchResponse::busy(format!(
            "{latitude}, {longitude}"
        ))),
    }
}

fn record(state: &AppState, submission: Submission) -> HttpResponse {
    let status = match submission.error().map(postcode_map_pipeline::SearchError::kind) {
        None => StatusCode::OK,
        Some(SearchErrorKind::Format) => StatusCode::BAD_REQUEST,
        Some(SearchErrorKind::UnknownPostcode) => StatusCode::NOT_FOUND,
        Some(SearchErrorKind::Backend | SearchErrorKind::Schema) => StatusCode::BAD_GATEWAY,
    };

    state.explorer().apply(&submission);

    HttpResponse::build(status).json(ApiSearchResponse::from(submission))
}

/// `GET /api/history`
pub async fn history(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.explorer().history().items())
}

/// `DELETE /api/history`
pub async fn clear_history(state: web::Data<AppState>) -> HttpResponse {
    let mut explorer = state.explorer();
    let changed = explorer.history().len();
    explorer.clear();
    HttpResponse::Ok().json(ApiChanged { changed })
}

/// `DELETE /api/history/{id}`
pub async fn remove_entry(state: web::Data<AppState>, id: web::Path<SearchId>) -> HttpResponse {
    let id = id.into_inner();
    if state.explorer().remove(id) {
        HttpResponse::Ok().json(ApiChanged { changed: 1 })
    } else {
        not_found(id)
    }
}

/// `POST /api/history/{id}/hide`
pub async fn hide_entry(state: web::Data<AppState>, id: web::Path<SearchId>) -> HttpResponse {
    set_hidden(&state, id.into_inner(), true)
}

/// `POST /api/history/{id}/unhide`
pub async fn unhide_entry(state: web::Data<AppState>, id: web::Path<SearchId>) -> HttpResponse {
    set_hidden(&state, id.into_inner(), false)
}

fn set_hidden(state: &AppState, id: SearchId, hidden: bool) -> HttpResponse {
    let mut explorer = state.explorer();
    if explorer.history().get(id).is_none() {
        return not_found(id);
    }

    let changed = if hidden {
        explorer.hide(id)
    } else {
        explorer.unhide(id)
    };
    HttpResponse::Ok().json(ApiChanged {
        changed: usize::from(changed),
    })
}

/// `POST /api/history/unhide-all`
pub async fn unhide_all(state: web::Data<AppState>) -> HttpResponse {
    let changed = state.explorer().unhide_all();
    HttpResponse::Ok().json(ApiChanged { changed })
}

/// `GET /api/table?sort=asc|desc`
pub async fn table(state: web::Data<AppState>, query: web::Query<TableQuery>) -> HttpResponse {
    let order = query.sort.unwrap_or_default();
    HttpResponse::Ok().json(state.explorer().table_rows(order))
}

/// `GET /api/map`
pub async fn map(state: web::Data<AppState>) -> HttpResponse {
    let explorer = state.explorer();
    let map = explorer.map();
    HttpResponse::Ok().json(ApiMap {
        viewport: map.viewport(),
        manual: map.is_manual(),
        selected: map.selected(),
        markers: explorer.markers(),
    })
}

/// `PUT /api/map/viewport`
///
/// Records a user pan/zoom. Later searches no longer move the map.
pub async fn set_viewport(
    state: web::Data<AppState>,
    body: web::Json<Viewport>,
) -> HttpResponse {
    let viewport = body.into_inner();
    if !viewport.center.is_valid() || viewport.zoom > MAX_ZOOM {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "Viewport out of range (zoom must be at most {MAX_ZOOM})"
        )));
    }

    state.explorer().set_viewport(viewport);
    HttpResponse::Ok().json(viewport)
}

/// `POST /api/map/focus/{id}`
pub async fn focus(state: web::Data<AppState>, id: web::Path<SearchId>) -> HttpResponse {
    let id = id.into_inner();
    let mut explorer = state.explorer();
    if explorer.focus(id) {
        HttpResponse::Ok().json(explorer.map().viewport())
    } else {
        not_found(id)
    }
}

/// `PUT /api/display`
pub async fn set_display(
    state: web::Data<AppState>,
    body: web::Json<DisplayOptions>,
) -> HttpResponse {
    let options = body.into_inner();
    state.explorer().set_options(options);
    HttpResponse::Ok().json(options)
}

fn not_found(id: SearchId) -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new(format!("Search {id} is not in the history")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use postcode_map_contract::fixtures;
    use postcode_map_history::SearchHistory;
    use postcode_map_pipeline::NullProgress;
    use postcode_map_pipeline::testing::{StubBackend, StubResponse};
    use serde_json::{Value, json};

    use crate::{AppState, configure};

    fn state(backend: StubBackend) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Arc::new(backend),
            SearchHistory::in_memory(20),
        ))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = app!(state(StubBackend::new()));
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], json!(true));
        assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[actix_web::test]
    async fn search_records_history_and_table() {
        let state = state(
            StubBackend::new().with_search(StubResponse::Json(fixtures::search_response(42))),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({ "postcode": "sw1a 2aa" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["enteredPostcode"], json!("sw1a 2aa"));
        assert_eq!(body["data"]["metadata"]["searchID"], json!(42));

        let req = test::TestRequest::get().uri("/api/history").to_request();
        let history: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["hidden"], json!(false));

        let req = test::TestRequest::get().uri("/api/table?sort=asc").to_request();
        let rows: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rows[0]["postcode"], json!("SW1A 2AA"));

        let req = test::TestRequest::get().uri("/api/map").to_request();
        let map: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(map["selected"], json!(42));
        assert_eq!(map["markers"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn search_errors_map_to_status_codes() {
        let app = app!(state(StubBackend::new().with_search(StubResponse::Status(500))));

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({ "postcode": "1234" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], json!("format"));

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({ "postcode": "GL1 1LB" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], json!("backend"));
        assert!(body.get("data").is_none());

        let req = test::TestRequest::get().uri("/api/history").to_request();
        let history: Value = test::call_and_read_body_json(&app, req).await;
        assert!(history.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn schema_errors_carry_issues() {
        let mut body = fixtures::search_response(3);
        body["searchID"] = json!("three");
        let app = app!(state(StubBackend::new().with_search(StubResponse::Json(body))));

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({ "postcode": "GL1 1LB" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], json!("schema"));
        assert_eq!(
            body["error"]["issues"],
            json!(["searchID: Expected integer, received string"])
        );
    }

    #[actix_web::test]
    async fn coordinate_search() {
        let app = app!(state(StubBackend::new()));
        let req = test::TestRequest::get()
            .uri("/api/search?latitude=51.5&longitude=-0.12")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["enteredPostcode"], json!("51.5, -0.12"));
    }

    #[actix_web::test]
    async fn history_mutations() {
        let state = state(StubBackend::new());
        let submission = state.pipeline.submit("SW1A 2AA", &NullProgress).await;
        state.explorer().apply(&submission);
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/history/1/hide").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "changed": 1 }));

        let req = test::TestRequest::get().uri("/api/map").to_request();
        let map: Value = test::call_and_read_body_json(&app, req).await;
        assert!(map["markers"].as_array().unwrap().is_empty());

        let req = test::TestRequest::post().uri("/api/history/unhide-all").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "changed": 1 }));

        let req = test::TestRequest::post().uri("/api/history/99/hide").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::delete().uri("/api/history/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        let req = test::TestRequest::delete().uri("/api/history/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::delete().uri("/api/history").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "changed": 0 }));
    }

    #[actix_web::test]
    async fn manual_viewport_survives_search_until_focus() {
        let state = state(StubBackend::new());
        let app = app!(state);

        let viewport = json!({ "center": { "lat": 50.0, "lng": -4.0 }, "zoom": 9 });
        let req = test::TestRequest::put()
            .uri("/api/map/viewport")
            .set_json(&viewport)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({ "postcode": "SW1A 2AA" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/api/map").to_request();
        let map: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(map["viewport"], viewport);
        assert_eq!(map["manual"], json!(true));

        let req = test::TestRequest::post().uri("/api/map/focus/1").to_request();
        let focused: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(focused["center"]["lat"], json!(51.503_54));

        let req = test::TestRequest::put()
            .uri("/api/map/viewport")
            .set_json(json!({ "center": { "lat": 95.0, "lng": 0.0 }, "zoom": 9 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn display_toggles_extend_table_rows() {
        let state = state(StubBackend::new());
        let submission = state.pipeline.submit("SW1A 2AA", &NullProgress).await;
        state.explorer().apply(&submission);
        let app = app!(state);

        let req = test::TestRequest::put()
            .uri("/api/display")
            .set_json(json!({ "showAllStops": true, "showAllCrimes": false }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/api/table").to_request();
        let rows: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rows[0]["stops"].as_array().unwrap().len(), 2);
        assert!(rows[0].get("crimes").is_none());
    }

    #[actix_web::test]
    async fn status_reports_health_and_drift() {
        let app = app!(state(StubBackend::new()));
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("healthy"));
        assert_eq!(body["uptime"], json!("4d 23h 58m 1s"));
        assert_eq!(body["checkedAt"], json!("28 Oct 2025, 19:59:39"));

        let mut health = fixtures::health_response();
        health["database"]["status"] = json!("sleeping");
        let app = app!(state(StubBackend::new().with_health(StubResponse::Json(health))));
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["issues"].as_array().unwrap().len(), 1);

        let app = app!(state(StubBackend::new().with_health(StubResponse::Status(503))));
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"]["msg"], json!("Failed to fetch health"));
        assert!(body["error"].get("issues").is_none());
    }

    #[actix_web::test]
    async fn search_is_refused_while_pending() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let backend = Arc::new(StubBackend::new().with_gate(gate.clone()));
        let state = web::Data::new(AppState::new(backend.clone(), SearchHistory::in_memory(20)));
        let app = app!(state);

        let first = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/search")
                .set_json(json!({ "postcode": "SW1A 2AA" }))
                .to_request(),
        );
        let second = async {
            backend.entered().notified().await;
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/search")
                    .set_json(json!({ "postcode": "GL1 1LB" }))
                    .to_request(),
            )
            .await;
            gate.notify_one();
            resp
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.status(), 200);
        assert_eq!(second.status(), 409);
        let body: Value = test::read_body_json(second).await;
        assert_eq!(body["error"]["kind"], json!("busy"));
    }
}
