// src/models/test_definition.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::track::validate_slug;

/// Represents the 'tests' table, keyed by `(track_slug, test_id)`.
/// `question_ids` order is exam order.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub track_slug: String,
    pub test_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub test_type: String,
    pub duration_sec: i64,
    pub question_ids: Json<Vec<String>>,
    pub meta: Option<Json<serde_json::Value>>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Lightweight listing projection. Never carries question ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub test_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub test_type: String,
    pub duration_sec: i64,
    pub question_count: usize,
}

impl From<&TestDefinition> for TestSummary {
    fn from(test: &TestDefinition) -> Self {
        Self {
            test_id: test.test_id.clone(),
            title: test.title.clone(),
            test_type: test.test_type.clone(),
            duration_sec: test.duration_sec,
            question_count: test.question_ids.len(),
        }
    }
}

/// DTO for creating or replacing a test definition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTestRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_slug))]
    pub track_slug: String,
    #[validate(length(min = 1, max = 100, message = "testId is required"))]
    pub test_id: String,
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(rename = "type", default)]
    #[validate(length(max = 50))]
    pub test_type: String,
    #[validate(range(min = 1, max = 86400))]
    pub duration_sec: i64,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_request_reads_camel_case() {
        let req: UpsertTestRequest = serde_json::from_value(serde_json::json!({
            "trackSlug": "rust",
            "testId": "t1",
            "title": "Ownership",
            "type": "Mixed",
            "durationSec": 600,
            "questionIds": ["q1", "q2"]
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.test_type, "Mixed");
        assert_eq!(req.question_ids.len(), 2);
    }

    #[test]
    fn empty_test_id_is_rejected() {
        let req: UpsertTestRequest = serde_json::from_value(serde_json::json!({
            "trackSlug": "rust",
            "testId": "",
            "title": "Ownership",
            "durationSec": 600
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn summary_counts_questions_without_exposing_them() {
        let test = TestDefinition {
            track_slug: "rust".to_string(),
            test_id: "t1".to_string(),
            title: "Ownership".to_string(),
            test_type: "Mixed".to_string(),
            duration_sec: 600,
            question_ids: Json(vec!["q1".to_string(), "q2".to_string()]),
            meta: None,
            updated_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(TestSummary::from(&test)).unwrap();
        assert_eq!(json["questionCount"], 2);
        assert!(json.get("questionIds").is_none());
    }
}
