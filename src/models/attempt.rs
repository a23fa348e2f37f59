// src/models/attempt.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

use crate::models::question::{AnswerValue, QuestionSnapshot, SanitizedQuestion};

/// Lifecycle of an attempt. `Active` may move to either terminal state exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttemptStatus {
    Active,
    Submitted,
    Terminated,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::Active)
    }
}

/// Represents the 'attempts' table.
/// `questions_snapshot` is written once at start and never changes afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub user_id: Option<String>,
    pub track_slug: String,
    pub test_id: String,
    pub status: AttemptStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_sec: i64,
    pub questions_snapshot: Json<Vec<QuestionSnapshot>>,
    pub answers: Json<Vec<AnswerRecord>>,
    pub score: f64,
}

/// A graded answer as persisted on the attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// `None` when the client sent no usable index.
    pub q_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnswerValue>,
    /// `None` for question types that are not auto-graded.
    pub correct: Option<bool>,
    #[serde(default)]
    pub points_awarded: f64,
}

/// One answer as sent by the client.
///
/// Parsing never fails for a single entry: a missing or non-integer `qIndex`
/// becomes `None` and grades as incorrect, like an out-of-range index.
#[derive(Debug, Clone)]
pub struct SubmittedAnswer {
    pub q_index: Option<i64>,
    pub value: Option<AnswerValue>,
}

impl SubmittedAnswer {
    pub fn from_json(raw: &Value) -> Self {
        Self {
            q_index: raw.get("qIndex").and_then(Value::as_i64),
            value: raw
                .get("value")
                .filter(|v| !v.is_null())
                .cloned()
                .map(AnswerValue::from_json),
        }
    }
}

impl<'de> Deserialize<'de> for SubmittedAnswer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&raw))
    }
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<SubmittedAnswer>,
}

/// DTO returned by `start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub duration_sec: i64,
    pub title: String,
    pub questions: Vec<SanitizedQuestion>,
}

/// Outcome of a successful submit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub score: f64,
    pub total: f64,
}

/// Client-facing readback of an attempt; questions are sanitized.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub id: String,
    pub track_slug: String,
    pub test_id: String,
    pub status: AttemptStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_sec: i64,
    pub score: f64,
    pub total: f64,
    pub answers: Vec<AnswerRecord>,
    pub questions: Vec<SanitizedQuestion>,
}

impl From<Attempt> for AttemptView {
    fn from(attempt: Attempt) -> Self {
        let total = crate::services::grading::total_points(&attempt.questions_snapshot);
        let questions = attempt.questions_snapshot.iter().map(|q| q.sanitized()).collect();
        Self {
            id: attempt.id,
            track_slug: attempt.track_slug,
            test_id: attempt.test_id,
            status: attempt.status,
            started_at: attempt.started_at,
            ended_at: attempt.ended_at,
            duration_sec: attempt.duration_sec,
            score: attempt.score,
            total,
            answers: attempt.answers.0,
            questions,
        }
    }
}

/// Read-side rollup for one test.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    pub total: usize,
    pub submitted: usize,
    pub avg_score: f64,
    pub attempts: Vec<Attempt>,
}
