// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::NaiveDate;
use ecotrace::config::Config;
use ecotrace::db::{FirestoreDb, MemoryStore, Store};
use ecotrace::middleware::auth::create_jwt;
use ecotrace::models::{Friendship, User};
use ecotrace::routes::create_router;
use ecotrace::time_utils::ManualClock;
use ecotrace::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Day every test app starts on (a Wednesday).
#[allow(dead_code)]
pub fn test_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 5).unwrap()
}

/// Everything a router test needs to reach behind the HTTP surface.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
impl TestApp {
    /// Bearer token for `user_id`, signed with the test key.
    pub fn token(&self, user_id: u64) -> String {
        create_jwt(user_id, &self.state.config.jwt_signing_key).unwrap()
    }

    /// Send one request as `user_id` and return the response.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user_id: u64,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)));

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn seed_user(&self, id: u64, username: &str) {
        seed_user(self.store.as_ref(), id, username).await;
    }

    pub async fn befriend(&self, a: u64, b: u64) {
        self.store
            .upsert_friendship(&Friendship::accepted(a, b))
            .await
            .unwrap();
    }
}

/// Insert a user with a derived email address.
#[allow(dead_code)]
pub async fn seed_user(store: &dyn Store, id: u64, username: &str) {
    let mut user = User::new(id, username);
    user.email = Some(format!("{}@example.com", username));
    store.upsert_user(&user).await.unwrap();
}

/// Create a test app backed by the in-memory store and a manual clock.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_noon(test_today()));

    let state = Arc::new(AppState::new(config, store.clone(), clock.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        clock,
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
