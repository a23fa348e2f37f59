// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, services::analytics::Analytics, utils::jwt::AdminUser};

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub limit: Option<i64>,
}

/// Attempt statistics for one test.
/// Admin only. `limit` defaults to 100 and is capped at 500.
pub async fn attempt_stats(
    State(analytics): State<Analytics>,
    _admin: AdminUser,
    Path((slug, test_id)): Path<(String, String)>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, AppError> {
    let stats = analytics.attempt_stats(&slug, &test_id, params.limit).await?;
    Ok(Json(stats))
}
