// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use exam_backend::{
    config::Config,
    routes,
    services::events::{BroadcastSink, EventSink, NoopSink},
    state::AppState,
    utils::jwt::sign_jwt,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    pub admin_token: String,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        submit_grace_secs: None,
        event_buffer: 16,
    }
}

/// In-memory database with migrations applied.
/// One connection that never expires, so the database lives as long as the pool.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

pub fn test_state(pool: SqlitePool, config: Config, events: Arc<dyn EventSink>) -> AppState {
    AppState::new(pool, config, events)
}

pub fn broadcast_state(pool: SqlitePool, config: Config) -> (AppState, BroadcastSink) {
    let sink = BroadcastSink::new(config.event_buffer);
    let state = AppState::new(pool, config, Arc::new(sink.clone()));
    (state, sink)
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    let pool = test_pool().await;
    let state = test_state(pool.clone(), test_config(), Arc::new(NoopSink));

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
        admin_token: sign_jwt("admin-1", "admin", JWT_SECRET, 600).unwrap(),
    }
}

/// Inserts a bank question the way the content pipeline would.
/// `answer` is the canonical answer as JSON (`1`, `"B"`), or `None`.
pub async fn seed_question(
    pool: &SqlitePool,
    id: &str,
    question_type: &str,
    answer: Option<serde_json::Value>,
    points: f64,
) {
    sqlx::query(
        "INSERT INTO question_bank (id, type, text, options, canonical_answer, points)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(question_type)
    .bind(format!("Question {}", id))
    .bind(r#"["A", "B", "C", "D"]"#)
    .bind(answer.map(|a| a.to_string()))
    .bind(points)
    .execute(pool)
    .await
    .expect("Failed to seed question");
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub async fn admin_post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Seeds the standard paper: two MCQs (canonical `1` and `"B"`) and one
    /// descriptive question, one point each, and files them under a fresh test.
    /// Returns `(track_slug, test_id)`.
    pub async fn seed_standard_test(&self) -> (String, String) {
        let q0 = unique("mcq-num");
        let q1 = unique("mcq-text");
        let q2 = unique("essay");
        seed_question(&self.pool, &q0, "mcq", Some(serde_json::json!(1)), 1.0).await;
        seed_question(&self.pool, &q1, "mcq", Some(serde_json::json!("B")), 1.0).await;
        seed_question(&self.pool, &q2, "descriptive", None, 1.0).await;

        let slug = unique("track");
        let resp = self
            .admin_post(
                "/tracks",
                serde_json::json!({"title": "Backend", "description": "Core skills", "slug": slug}),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);

        let test_id = unique("test");
        let resp = self
            .admin_post(
                "/tests",
                serde_json::json!({
                    "trackSlug": slug,
                    "testId": test_id,
                    "title": "Fundamentals",
                    "type": "Mixed",
                    "durationSec": 900,
                    "questionIds": [q0, q1, q2],
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);

        (slug, test_id)
    }
}
