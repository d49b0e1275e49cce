//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the real router over a lifecycle engine wired to the
//! in-memory gateway and notification sink, so requests can be driven with
//! `tower::ServiceExt::oneshot` without a Discord guild.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ticketdesk_core::config::{DatabaseConfig, DiscordConfig, ServerConfig, TicketsConfig};
use ticketdesk_core::testing::fixtures::{
    lifecycle_config, TestHarness, CLOSED_GROUP, LOG_CHANNEL, OPEN_GROUP, STAFF_ROLE,
};
use ticketdesk_core::{create_authenticator, AuthMethod, Config, LifecycleConfig};
use ticketdesk_server::api::create_router;
use ticketdesk_server::state::AppState;

/// Re-export fixtures for test convenience
pub use ticketdesk_core::testing::fixtures;

/// API key accepted when a fixture is built with [`TestFixture::with_api_key`].
pub const API_KEY: &str = "test-api-key";

/// In-process server over mocks.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Engine, gateway and sink behind the router
    pub harness: TestHarness,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Fixture without authentication.
    pub async fn new() -> Self {
        Self::build(lifecycle_config(), AuthMethod::None).await
    }

    /// Fixture requiring [`API_KEY`].
    pub async fn with_api_key() -> Self {
        Self::build(lifecycle_config(), AuthMethod::ApiKey).await
    }

    /// Fixture with custom lifecycle settings and no authentication.
    pub async fn with_lifecycle(config: LifecycleConfig) -> Self {
        Self::build(config, AuthMethod::None).await
    }

    async fn build(lifecycle: LifecycleConfig, method: AuthMethod) -> Self {
        let harness = TestHarness::with_config(lifecycle).await;

        let config = Config {
            auth: ticketdesk_core::config::AuthConfig {
                method,
                api_key: match method {
                    AuthMethod::ApiKey => Some(API_KEY.to_string()),
                    AuthMethod::None => None,
                },
            },
            discord: DiscordConfig {
                token: "bot-token".to_string(),
                guild_id: 1,
                ticket_category_id: OPEN_GROUP,
                closed_category_id: CLOSED_GROUP,
                log_channel_id: LOG_CHANNEL,
                support_role_id: STAFF_ROLE,
                api_base: "http://127.0.0.1:9".to_string(),
                timeout_secs: 1,
            },
            tickets: TicketsConfig::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
        };

        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));
        let state = Arc::new(AppState::new(
            config,
            authenticator,
            harness.engine.clone(),
        ));

        Self {
            router: create_router(state),
            harness,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body), &[]).await
    }

    /// Send a request with extra headers.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {{
        let response = &$response;
        assert_eq!(
            response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            response.status,
            serde_json::to_string_pretty(&response.body).unwrap_or_default()
        );
    }};
}
