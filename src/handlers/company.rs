// src/handlers/company.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::company_test::{CompanySubmitRequest, UpsertCompanyTestRequest},
    services::company::CompanyTests,
    utils::jwt::AdminUser,
};

/// Creates or replaces a company test definition.
/// Admin only.
pub async fn upsert_company_test(
    State(company): State<CompanyTests>,
    _admin: AdminUser,
    payload: Result<Json<UpsertCompanyTestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let test = company.upsert(payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

pub async fn list_company_tests(
    State(company): State<CompanyTests>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(company.list(&slug).await?))
}

/// Returns sanitized sections. No attempt is recorded.
pub async fn start_company_test(
    State(company): State<CompanyTests>,
    Path((slug, test_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(company.start(&slug, &test_id).await?))
}

/// Grades `mcq` responses against the current bank; other sections are echoed.
pub async fn submit_company_test(
    State(company): State<CompanyTests>,
    Path((slug, test_id)): Path<(String, String)>,
    payload: Result<Json<CompanySubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    Ok(Json(company.submit(&slug, &test_id, payload).await?))
}
