// src/services/analytics.rs

use sqlx::SqlitePool;

use crate::{
    config::{DEFAULT_ATTEMPT_LIMIT, MAX_ATTEMPT_LIMIT},
    error::AppError,
    models::attempt::{Attempt, AttemptStats, AttemptStatus},
    services::attempts::ATTEMPT_COLUMNS,
};

/// Read-only rollups over stored attempts.
#[derive(Clone)]
pub struct Analytics {
    pool: SqlitePool,
}

impl Analytics {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Newest-first attempts for a test, at most `limit` (clamped to 1..=500).
    pub async fn attempt_stats(
        &self,
        track_slug: &str,
        test_id: &str,
        limit: Option<i64>,
    ) -> Result<AttemptStats, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_ATTEMPT_LIMIT)
            .clamp(1, MAX_ATTEMPT_LIMIT);

        let attempts = sqlx::query_as::<_, Attempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM attempts
            WHERE track_slug = $1 AND test_id = $2
            ORDER BY started_at DESC, rowid DESC
            LIMIT $3
            "#
        ))
        .bind(track_slug)
        .bind(test_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(summarize(attempts))
    }
}

/// `avg_score` covers submitted attempts only; 0 when there are none.
pub fn summarize(attempts: Vec<Attempt>) -> AttemptStats {
    let scores: Vec<f64> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Submitted)
        .map(|a| a.score)
        .collect();

    let avg_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    AttemptStats {
        total: attempts.len(),
        submitted: scores.len(),
        avg_score,
        attempts,
    }
}
