// src/services/bank.rs

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{error::AppError, models::question::BankEntry};

/// Read-only access to the shared question bank.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Returns the entries that exist for `ids`, in no particular order.
    /// Unknown ids are simply absent from the result.
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<BankEntry>, AppError>;
}

/// Bank backed by the `question_bank` table the content pipeline writes.
#[derive(Clone)]
pub struct SqlQuestionBank {
    pool: SqlitePool,
}

impl SqlQuestionBank {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBank for SqlQuestionBank {
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<BankEntry>, AppError> {
        let unique: HashSet<&String> = ids.iter().collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        // Dynamic IN clause
        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, type, text, options, canonical_answer, points FROM question_bank WHERE id IN (",
        );
        let mut separated = query_builder.separated(",");
        for id in unique {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        query_builder
            .build_query_as::<BankEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read question bank: {:?}", e);
                AppError::UpstreamUnavailable(e.to_string())
            })
    }
}

/// Ids from `ids` that the bank could not resolve, in request order.
pub async fn missing_ids(bank: &dyn QuestionBank, ids: &[String]) -> Result<Vec<String>, AppError> {
    let found: HashSet<String> = bank.fetch_many(ids).await?.into_iter().map(|e| e.id).collect();
    let mut reported = HashSet::new();
    Ok(ids
        .iter()
        .filter(|id| !found.contains(*id) && reported.insert(*id))
        .cloned()
        .collect())
}
