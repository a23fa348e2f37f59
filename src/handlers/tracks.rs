// src/handlers/tracks.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{test_definition::UpsertTestRequest, track::CreateTrackRequest},
    services::catalog::TestStore,
    utils::jwt::AdminUser,
};

/// Creates a new track.
/// Admin only. Duplicate slugs are rejected with 409.
pub async fn create_track(
    State(store): State<TestStore>,
    _admin: AdminUser,
    payload: Result<Json<CreateTrackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let track = store.create_track(payload).await?;
    Ok((StatusCode::CREATED, Json(track)))
}

/// Lists all tracks.
pub async fn list_tracks(State(store): State<TestStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_tracks().await?))
}

/// Retrieves a single track by slug.
pub async fn get_track(
    State(store): State<TestStore>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_track(&slug).await?))
}

/// Creates or replaces a test definition.
/// Admin only. Rejected as a whole if any question id is unknown to the bank.
pub async fn upsert_test(
    State(store): State<TestStore>,
    _admin: AdminUser,
    payload: Result<Json<UpsertTestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let test = store.upsert_test(payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

/// Lists lightweight projections of a track's tests (no question ids).
pub async fn list_tests(
    State(store): State<TestStore>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_tests_for_track(&slug).await?))
}

/// Retrieves a full test definition. Canonical answers live only in the bank.
pub async fn get_test(
    State(store): State<TestStore>,
    Path((slug, test_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_test(&slug, &test_id).await?))
}
