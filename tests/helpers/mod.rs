//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use tidyhub_api::{AppState, Claims, build_router};
use tidyhub_cache::CacheManager;
use tidyhub_core::config::AppConfig;
use tidyhub_core::traits::SystemClock;
use tidyhub_core::types::UserId;
use tidyhub_database::{ChangeFeed, MemoryStore, Stores};
use tidyhub_entity::profile::Profile;
use tidyhub_service::ChatServices;

/// Test application over a fresh in-memory store.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Backing store, for seeding profiles
    pub memory: Arc<MemoryStore>,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with a customised config
    pub fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let stores = Stores::from_memory(memory.clone());
        let services = ChatServices::new(
            &stores,
            CacheManager::new(&config.cache),
            ChangeFeed::new(config.realtime.channel_buffer_size),
            Arc::new(SystemClock),
            &config,
        );

        let router = build_router(AppState::new(config.clone(), stores, services));

        Self {
            router,
            memory,
            config,
        }
    }

    /// Create a user with a profile and return their ID
    pub async fn create_user(&self, full_name: &str) -> UserId {
        let user_id = UserId::new();
        self.memory
            .seed_profile(Profile {
                user_id,
                full_name: Some(full_name.to_string()),
                business_name: None,
                avatar_url: None,
            })
            .await;
        user_id
    }

    /// Sign a bearer token for `user` with the configured secret
    pub fn token_for(&self, user: UserId) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.into_uuid(),
            exp: now + 3600,
            iat: Some(now),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .expect("Failed to sign token")
    }

    /// Open (or fetch) the conversation between two users as `customer`
    pub async fn conversation(&self, customer: UserId, provider: UserId) -> String {
        let token = self.token_for(customer);
        let body = serde_json::json!({
            "customer_id": customer,
            "provider_id": provider,
        });
        let response = self
            .request("POST", "/api/conversations", Some(body), Some(&token))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("No conversation id")
            .to_string()
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
