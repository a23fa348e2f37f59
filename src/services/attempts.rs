// src/services/attempts.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{SqlitePool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, StartAttemptResponse, SubmitOutcome, SubmittedAnswer},
        question::build_snapshot,
    },
    proctor::AttemptTerminator,
    services::{
        bank::QuestionBank,
        catalog::TestStore,
        events::{AttemptEvent, EventSink},
        grading,
    },
};

pub(crate) const ATTEMPT_COLUMNS: &str = "id, user_id, track_slug, test_id, status, started_at, \
     ended_at, duration_sec, questions_snapshot, answers, score";

/// Owns the attempt lifecycle: `start`, then exactly one of `submit` or `terminate`.
///
/// Every transition out of `active` is a single conditional UPDATE on
/// `status = 'active'`, so concurrent submit/terminate calls for one attempt
/// cannot both win.
#[derive(Clone)]
pub struct AttemptManager {
    pool: SqlitePool,
    tests: TestStore,
    bank: Arc<dyn QuestionBank>,
    events: Arc<dyn EventSink>,
    submit_grace: Option<TimeDelta>,
}

fn not_active(attempt_id: &str) -> AppError {
    AppError::InvalidAttemptState(format!("Attempt '{}' is missing or no longer active", attempt_id))
}

impl AttemptManager {
    pub fn new(
        pool: SqlitePool,
        tests: TestStore,
        bank: Arc<dyn QuestionBank>,
        events: Arc<dyn EventSink>,
        submit_grace_secs: Option<u64>,
    ) -> Self {
        let submit_grace = submit_grace_secs.map(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX)
        });
        Self {
            pool,
            tests,
            bank,
            events,
            submit_grace,
        }
    }

    /// Snapshots the test's questions into a new active attempt and returns
    /// them without canonical answers.
    pub async fn start(
        &self,
        track_slug: &str,
        test_id: &str,
        user_id: Option<String>,
    ) -> Result<StartAttemptResponse, AppError> {
        let test = self.tests.get_test(track_slug, test_id).await?;

        let entries = self.bank.fetch_many(&test.question_ids).await?;
        let snapshot = build_snapshot(&test.question_ids, entries);
        if snapshot.len() < test.question_ids.len() {
            tracing::warn!(
                track = track_slug,
                test_id,
                dropped = test.question_ids.len() - snapshot.len(),
                "questions missing from bank were left out of the snapshot"
            );
        }

        let attempt_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO attempts
            (id, user_id, track_slug, test_id, status, started_at, duration_sec, questions_snapshot, answers, score)
            VALUES ($1, $2, $3, $4, 'active', $5, $6, $7, '[]', 0)
            "#,
        )
        .bind(&attempt_id)
        .bind(&user_id)
        .bind(track_slug)
        .bind(test_id)
        .bind(Utc::now())
        .bind(test.duration_sec)
        .bind(Json(&snapshot))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create attempt: {:?}", e);
            AppError::UpstreamUnavailable(e.to_string())
        })?;

        tracing::info!(%attempt_id, track = track_slug, test_id, "attempt started");
        self.events.publish(AttemptEvent::Started {
            attempt_id: attempt_id.clone(),
            track_slug: track_slug.to_string(),
            test_id: test_id.to_string(),
            user_id,
        });

        Ok(StartAttemptResponse {
            attempt_id,
            duration_sec: test.duration_sec,
            title: test.title,
            questions: snapshot.iter().map(|q| q.sanitized()).collect(),
        })
    }

    /// Grades `answers` against the attempt's own snapshot and closes it.
    pub async fn submit(
        &self,
        attempt_id: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<SubmitOutcome, AppError> {
        let attempt = self.find(attempt_id).await?.ok_or_else(|| not_active(attempt_id))?;
        if attempt.status.is_terminal() {
            tracing::warn!(%attempt_id, status = ?attempt.status, "submit rejected");
            return Err(not_active(attempt_id));
        }

        let now = Utc::now();
        if let Some(grace) = self.submit_grace {
            let deadline = TimeDelta::try_seconds(attempt.duration_sec)
                .and_then(|limit| limit.checked_add(&grace))
                .and_then(|limit| attempt.started_at.checked_add_signed(limit));
            if deadline.is_some_and(|deadline| now > deadline) {
                if self.mark_terminated(attempt_id, now).await? {
                    tracing::info!(%attempt_id, "attempt terminated: time limit exceeded");
                    self.events.publish(AttemptEvent::Terminated {
                        attempt_id: attempt_id.to_string(),
                    });
                }
                return Err(AppError::InvalidAttemptState(
                    "Attempt time limit exceeded".to_string(),
                ));
            }
        }

        let evaluation = grading::grade(&attempt.questions_snapshot, answers);
        let total = grading::total_points(&attempt.questions_snapshot);

        let result = sqlx::query(
            r#"
            UPDATE attempts
            SET status = 'submitted', answers = $1, score = $2, ended_at = $3
            WHERE id = $4 AND status = 'active'
            "#,
        )
        .bind(Json(&evaluation.answers))
        .bind(evaluation.score)
        .bind(now)
        .bind(attempt_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(%attempt_id, "submit lost the race to another transition");
            return Err(not_active(attempt_id));
        }

        tracing::info!(%attempt_id, score = evaluation.score, total, "attempt submitted");
        self.events.publish(AttemptEvent::Submitted {
            attempt_id: attempt_id.to_string(),
            score: evaluation.score,
            total,
        });

        Ok(SubmitOutcome {
            score: evaluation.score,
            total,
        })
    }

    /// Ends an active attempt without grading it.
    pub async fn terminate(&self, attempt_id: &str) -> Result<(), AppError> {
        if !self.mark_terminated(attempt_id, Utc::now()).await? {
            tracing::warn!(%attempt_id, "terminate rejected");
            return Err(not_active(attempt_id));
        }

        tracing::info!(%attempt_id, "attempt terminated");
        self.events.publish(AttemptEvent::Terminated {
            attempt_id: attempt_id.to_string(),
        });
        Ok(())
    }

    pub async fn get(&self, attempt_id: &str) -> Result<Attempt, AppError> {
        self.find(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt '{}' not found", attempt_id)))
    }

    async fn find(&self, attempt_id: &str) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1"
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    /// Returns whether this call performed the `active -> terminated` transition.
    async fn mark_terminated(&self, attempt_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE attempts SET status = 'terminated', ended_at = $1 WHERE id = $2 AND status = 'active'",
        )
        .bind(now)
        .bind(attempt_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AttemptTerminator for AttemptManager {
    async fn terminate(&self, attempt_id: &str) -> Result<(), AppError> {
        AttemptManager::terminate(self, attempt_id).await
    }
}
