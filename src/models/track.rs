// src/models/track.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// Represents the 'tracks' table in the database.
/// A track groups related tests; its slug is immutable once a test references it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new track.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrackRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 100), custom(function = validate_slug))]
    pub slug: String,
}

/// Slugs are lowercase alphanumerics separated by single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(validator::ValidationError::new("invalid_slug"));
    }
    Ok(())
}
