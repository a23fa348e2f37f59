// src/services/catalog.rs

use std::sync::Arc;

use sqlx::{SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::{
        test_definition::{TestDefinition, TestSummary, UpsertTestRequest},
        track::{CreateTrackRequest, Track},
    },
    services::bank::{QuestionBank, missing_ids},
    utils::html::clean_html,
};

const TEST_COLUMNS: &str =
    "track_slug, test_id, title, test_type, duration_sec, question_ids, meta, updated_at";

/// Tracks and the test definitions filed under them.
#[derive(Clone)]
pub struct TestStore {
    pool: SqlitePool,
    bank: Arc<dyn QuestionBank>,
}

impl TestStore {
    pub fn new(pool: SqlitePool, bank: Arc<dyn QuestionBank>) -> Self {
        Self { pool, bank }
    }

    pub async fn create_track(&self, req: CreateTrackRequest) -> Result<Track, AppError> {
        let track = sqlx::query_as::<_, Track>(
            r#"
            INSERT INTO tracks (slug, title, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, slug, title, description, created_at
            "#,
        )
        .bind(&req.slug)
        .bind(clean_html(&req.title))
        .bind(clean_html(&req.description))
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Conflict(format!("Track '{}' already exists", req.slug))
            } else {
                tracing::error!("Failed to create track: {:?}", e);
                AppError::UpstreamUnavailable(e.to_string())
            }
        })?;

        tracing::info!(slug = %track.slug, "track created");
        Ok(track)
    }

    pub async fn list_tracks(&self) -> Result<Vec<Track>, AppError> {
        let tracks = sqlx::query_as::<_, Track>(
            "SELECT id, slug, title, description, created_at FROM tracks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tracks)
    }

    pub async fn get_track(&self, slug: &str) -> Result<Track, AppError> {
        sqlx::query_as::<_, Track>(
            "SELECT id, slug, title, description, created_at FROM tracks WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Track '{}' not found", slug)))
    }

    /// Creates or replaces the test keyed by `(track_slug, test_id)`.
    ///
    /// Every question id must resolve in the bank; otherwise nothing is written.
    /// Attempts already started keep their own snapshots.
    pub async fn upsert_test(&self, req: UpsertTestRequest) -> Result<TestDefinition, AppError> {
        self.get_track(&req.track_slug).await?;

        let missing = missing_ids(self.bank.as_ref(), &req.question_ids).await?;
        if !missing.is_empty() {
            tracing::warn!(test_id = %req.test_id, ?missing, "test rejected: unknown questions");
            return Err(AppError::BadRequest(format!(
                "Unknown question ids: {}",
                missing.join(", ")
            )));
        }

        let test = sqlx::query_as::<_, TestDefinition>(&format!(
            r#"
            INSERT INTO tests ({TEST_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (track_slug, test_id) DO UPDATE SET
                title = excluded.title,
                test_type = excluded.test_type,
                duration_sec = excluded.duration_sec,
                question_ids = excluded.question_ids,
                meta = excluded.meta,
                updated_at = excluded.updated_at
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(&req.track_slug)
        .bind(&req.test_id)
        .bind(clean_html(&req.title))
        .bind(&req.test_type)
        .bind(req.duration_sec)
        .bind(Json(&req.question_ids))
        .bind(req.meta.as_ref().map(Json))
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert test: {:?}", e);
            AppError::UpstreamUnavailable(e.to_string())
        })?;

        tracing::info!(
            track = %test.track_slug,
            test_id = %test.test_id,
            questions = test.question_ids.len(),
            "test saved"
        );
        Ok(test)
    }

    pub async fn list_tests_for_track(&self, track_slug: &str) -> Result<Vec<TestSummary>, AppError> {
        self.get_track(track_slug).await?;

        let tests = sqlx::query_as::<_, TestDefinition>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE track_slug = $1 ORDER BY test_id"
        ))
        .bind(track_slug)
        .fetch_all(&self.pool)
        .await?;

        Ok(tests.iter().map(TestSummary::from).collect())
    }

    pub async fn get_test(&self, track_slug: &str, test_id: &str) -> Result<TestDefinition, AppError> {
        sqlx::query_as::<_, TestDefinition>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE track_slug = $1 AND test_id = $2"
        ))
        .bind(track_slug)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test '{}/{}' not found", track_slug, test_id)))
    }
}
