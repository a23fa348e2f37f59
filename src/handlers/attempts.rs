// src/handlers/attempts.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::attempt::{AttemptView, SubmitAttemptRequest},
    services::attempts::AttemptManager,
    utils::jwt::MaybeUser,
};

/// Starts a new attempt and returns the sanitized questions.
///
/// * Anonymous callers are allowed; a bearer token attaches the user id.
/// * 404 if the test does not exist.
pub async fn start_attempt(
    State(manager): State<AttemptManager>,
    user: MaybeUser,
    Path((slug, test_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let started = manager.start(&slug, &test_id, user.user_id()).await?;
    Ok(Json(started))
}

/// Reads back an attempt without canonical answers.
pub async fn get_attempt(
    State(manager): State<AttemptManager>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = manager.get(&attempt_id).await?;
    Ok(Json(AttemptView::from(attempt)))
}

/// Grades and closes an active attempt.
/// 400 if the attempt is missing, already finished, or `answers` is not an array.
pub async fn submit_attempt(
    State(manager): State<AttemptManager>,
    Path(attempt_id): Path<String>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let outcome = manager.submit(&attempt_id, &payload.answers).await?;
    Ok(Json(json!({
        "score": outcome.score,
        "total": outcome.total,
        "success": true,
    })))
}

/// Ends an active attempt after a proctoring violation.
/// 400 if the attempt is missing or already finished.
pub async fn terminate_attempt(
    State(manager): State<AttemptManager>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    manager.terminate(&attempt_id).await?;
    Ok(Json(json!({ "ok": true })))
}
