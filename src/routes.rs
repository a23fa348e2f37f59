// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, company, health, tracks},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (tracks/tests, attempts, admin, company).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let track_routes = Router::new()
        .route("/", get(tracks::list_tracks).post(tracks::create_track))
        .route("/{slug}", get(tracks::get_track))
        .route("/{slug}/tests", get(tracks::list_tests))
        .route("/{slug}/tests/{test_id}", get(tracks::get_test))
        .route("/{slug}/tests/{test_id}/start", post(attempts::start_attempt));

    let attempt_routes = Router::new()
        .route("/{attempt_id}", get(attempts::get_attempt))
        .route("/{attempt_id}/submit", post(attempts::submit_attempt))
        .route("/{attempt_id}/terminate", post(attempts::terminate_attempt));

    let admin_routes = Router::new().route(
        "/tests/{slug}/{test_id}/attempts",
        get(admin::attempt_stats),
    );

    let company_routes = Router::new()
        .route("/tests", post(company::upsert_company_test))
        .route("/{slug}/tests", get(company::list_company_tests))
        .route("/{slug}/tests/{test_id}/start", post(company::start_company_test))
        .route("/{slug}/tests/{test_id}/submit", post(company::submit_company_test));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/tests", post(tracks::upsert_test))
        .nest("/api/tracks", track_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/company", company_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
