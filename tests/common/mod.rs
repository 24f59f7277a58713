//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use mailcast::config::{MailConfig, WebConfig};
use mailcast::db::{GroupRepository, UserRepository, MANAGERS_GROUP};
use mailcast::web::handlers::AppState;
use mailcast::web::middleware::JwtState;
use mailcast::web::router::{create_health_router, create_router};
use mailcast::{Database, DispatchEngine, FixedClock, Mailer, MemoryMailer};

pub const PASSWORD: &str = "password123";
pub const SENDER: &str = "news@example.com";

/// `Authorization` header value for an access token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Fixed "now" used by every test server.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn test_config() -> WebConfig {
    WebConfig {
        enabled: true,
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        ..Default::default()
    }
}

/// A router over an in-memory database with recording mailer and fixed clock.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub mailer: Arc<MemoryMailer>,
    pub clock: FixedClock,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mailer(MemoryMailer::new()).await
    }

    pub async fn with_mailer(mailer: MemoryMailer) -> Self {
        let config = test_config();
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");

        let mailer = Arc::new(mailer);
        let clock = FixedClock::new(t0());
        let mail = MailConfig {
            from: SENDER.to_string(),
            ..Default::default()
        };
        let dyn_mailer: Arc<dyn Mailer> = mailer.clone();
        let engine = DispatchEngine::new(db.clone(), dyn_mailer.clone(), &mail)
            .with_clock(Arc::new(clock.clone()));

        let app_state = Arc::new(AppState::new(db.clone(), &config, dyn_mailer, engine));
        let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));
        let router = create_router(app_state, jwt_state, &config.cors_origins)
            .merge(create_health_router());

        let server = TestServer::new(router).expect("Failed to create test server");
        Self {
            server,
            db,
            mailer,
            clock,
        }
    }

    /// Register a user and return the access token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "username": username,
                "password": PASSWORD,
                "email": format!("{username}@example.com")
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["data"]["access_token"]
            .as_str()
            .expect("No access token")
            .to_string()
    }

    /// Put an existing user into the managers group.
    pub async fn make_manager(&self, username: &str) {
        let user = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await
            .unwrap()
            .expect("user exists");
        let groups = GroupRepository::new(self.db.pool());
        let (group, _) = groups.get_or_create(MANAGERS_GROUP).await.unwrap();
        groups.add_member(group.id, user.id).await.unwrap();
    }

    pub async fn create_recipient(&self, token: &str, email: &str) -> i64 {
        let response = self
            .server
            .post("/api/recipients")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({"email": email, "full_name": "Иван Петров"}))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_message(&self, token: &str, subject: &str) -> i64 {
        let response = self
            .server
            .post("/api/messages")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({"subject": subject, "body": "Hello"}))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_mailing(&self, token: &str, message_id: i64, recipient_ids: &[i64]) -> i64 {
        let response = self
            .server
            .post("/api/mailings")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({"message_id": message_id, "recipient_ids": recipient_ids}))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }
}
