// src/models/question.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};

/// Question kind as stored in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum QuestionType {
    #[serde(rename = "MCQ", alias = "mcq")]
    Mcq,
    #[serde(rename = "Descriptive", alias = "descriptive")]
    Descriptive,
}

/// A submitted or canonical answer: either a number or free text, never both.
///
/// Anything else a client sends (booleans, arrays, objects) is kept verbatim
/// in `Other` so it can be recorded, but it never matches a canonical answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Numeric(f64),
    Text(String),
    Other(Value),
}

impl AnswerValue {
    /// Numeric reading of the value. Text counts when its trimmed form parses
    /// as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Numeric(n) => Some(*n).filter(|n| n.is_finite()),
            AnswerValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            AnswerValue::Other(_) => None,
        }
    }

    /// Text reading of the value; `None` for `Other`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AnswerValue::Numeric(n) => Some(n.to_string()),
            AnswerValue::Text(s) => Some(s.clone()),
            AnswerValue::Other(_) => None,
        }
    }

    /// Classifies an arbitrary JSON value sent by a client.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(AnswerValue::Numeric)
                .unwrap_or(AnswerValue::Other(Value::Number(n))),
            Value::String(s) => AnswerValue::Text(s),
            other => AnswerValue::Other(other),
        }
    }

    /// Reads a bank column that holds either JSON (`1`, `"B"`) or bare text (`B`).
    pub fn from_stored(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Null) => None,
            Ok(Value::Number(n)) => n.as_f64().map(AnswerValue::Numeric),
            Ok(Value::String(s)) => Some(AnswerValue::Text(s)),
            _ => Some(AnswerValue::Text(raw.to_string())),
        }
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        AnswerValue::Numeric(n)
    }
}

impl From<i32> for AnswerValue {
    fn from(n: i32) -> Self {
        AnswerValue::Numeric(f64::from(n))
    }
}

impl From<i64> for AnswerValue {
    fn from(n: i64) -> Self {
        AnswerValue::Numeric(n as f64)
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

/// Represents a row of the 'question_bank' table.
/// The bank is owned by the content pipeline; this service only reads it.
#[derive(Debug, Clone, FromRow)]
pub struct BankEntry {
    pub id: String,

    #[sqlx(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Choice labels, in display order. Empty for descriptive questions.
    pub options: Json<Vec<String>>,

    /// Option index for MCQ, free text or NULL for descriptive questions.
    /// Stored as JSON by some writers and as bare text by others.
    pub canonical_answer: Option<String>,

    pub points: f64,
}

/// Frozen copy of a bank entry taken when an attempt starts.
/// This, not the bank, is what the attempt is graded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    pub q_index: usize,
    pub bank_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub canonical_answer: Option<AnswerValue>,
    pub points: f64,
}

impl QuestionSnapshot {
    pub fn from_bank(q_index: usize, entry: BankEntry) -> Self {
        Self {
            q_index,
            bank_id: entry.id,
            question_type: entry.question_type,
            question_text: entry.text,
            options: entry.options.0,
            canonical_answer: entry
                .canonical_answer
                .as_deref()
                .and_then(AnswerValue::from_stored),
            points: entry.points,
        }
    }

    /// Client-facing view with the canonical answer stripped.
    pub fn sanitized(&self) -> SanitizedQuestion {
        SanitizedQuestion {
            q_index: self.q_index,
            bank_id: self.bank_id.clone(),
            question_type: self.question_type,
            question_text: self.question_text.clone(),
            options: self.options.clone(),
            points: self.points,
        }
    }
}

/// DTO for sending a question to the client (no canonical answer).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedQuestion {
    pub q_index: usize,
    pub bank_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub points: f64,
}

/// Builds a snapshot in the order of `ids`. Ids the bank no longer knows are
/// dropped; `qIndex` is the position within the resulting snapshot.
pub fn build_snapshot(ids: &[String], entries: Vec<BankEntry>) -> Vec<QuestionSnapshot> {
    let by_id: HashMap<String, BankEntry> =
        entries.into_iter().map(|e| (e.id.clone(), e)).collect();

    ids.iter()
        .filter_map(|id| by_id.get(id).cloned())
        .enumerate()
        .map(|(q_index, entry)| QuestionSnapshot::from_bank(q_index, entry))
        .collect()
}
