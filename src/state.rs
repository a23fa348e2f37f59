use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    services::{
        analytics::Analytics,
        attempts::AttemptManager,
        bank::{QuestionBank, SqlQuestionBank},
        catalog::TestStore,
        company::CompanyTests,
        events::EventSink,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub tests: TestStore,
    pub attempts: AttemptManager,
    pub analytics: Analytics,
    pub company: CompanyTests,
}

impl AppState {
    /// Wires the engine services over `pool`, reading questions from the
    /// `question_bank` table.
    pub fn new(pool: SqlitePool, config: Config, events: Arc<dyn EventSink>) -> Self {
        let bank: Arc<dyn QuestionBank> = Arc::new(SqlQuestionBank::new(pool.clone()));
        Self::with_bank(pool, config, bank, events)
    }

    pub fn with_bank(
        pool: SqlitePool,
        config: Config,
        bank: Arc<dyn QuestionBank>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let tests = TestStore::new(pool.clone(), bank.clone());
        let attempts = AttemptManager::new(
            pool.clone(),
            tests.clone(),
            bank.clone(),
            events,
            config.submit_grace_secs,
        );
        Self {
            analytics: Analytics::new(pool.clone()),
            company: CompanyTests::new(pool.clone(), bank),
            pool,
            config,
            tests,
            attempts,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for TestStore {
    fn from_ref(state: &AppState) -> Self {
        state.tests.clone()
    }
}

impl FromRef<AppState> for AttemptManager {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for Analytics {
    fn from_ref(state: &AppState) -> Self {
        state.analytics.clone()
    }
}

impl FromRef<AppState> for CompanyTests {
    fn from_ref(state: &AppState) -> Self {
        state.company.clone()
    }
}
