// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared harness for router-level tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chore_tracker_core::domain::destination::AllowedHosts;
use chore_tracker_core::domain::notification::{NotificationChannel, WebhookConfig};
use chore_tracker_core::infrastructure::webhook_client::DeliveryClient;
use chore_tracker_core::infrastructure::webhook_config::StaticWebhookConfigSource;
use chore_tracker_core::presentation::{router, ApiSettings, AppState};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const API_KEY: &str = "test-key";

pub struct TestApp {
    pub router: Router,
    pub webhooks: StaticWebhookConfigSource,
    pub dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_api_key(Some(API_KEY))
    }

    pub fn with_api_key(api_key: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let webhooks = StaticWebhookConfigSource::new();
        let delivery = DeliveryClient::http()
            .expect("http client")
            .with_backoff_base(Duration::from_millis(10));
        let settings = ApiSettings {
            api_key: api_key.map(str::to_string),
            attachments_dir: dir.path().join("attachments"),
            upload_dir: dir.path().join("uploads"),
        };
        let state = AppState::in_memory(settings, Arc::new(webhooks.clone()), delivery);
        Self {
            router: router(state),
            webhooks,
            dir,
        }
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.dir.path().join("attachments")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Configure a webhook channel pointing at `url`.
    pub fn set_webhook(
        &self,
        channel: NotificationChannel,
        url: &str,
        allowed_hosts: &[&str],
        max_retries: u32,
        token: Option<&str>,
    ) {
        let mut config = WebhookConfig::disabled(channel);
        config.url = Some(url.to_string());
        config.allowed_hosts = AllowedHosts::new(allowed_hosts.iter().copied());
        config.max_retries = max_retries;
        config.timeout = Duration::from_millis(500);
        config.bearer_token = token.map(str::to_string);
        self.webhooks.set(channel, config);
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        TestResponse { status, headers, body }
    }

    /// Authenticated JSON request.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", API_KEY);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    /// Create a user, a chore and a pending assignment; returns the assignment.
    pub async fn seed_assignment(&self) -> Value {
        let user = self.call(Method::POST, "/users", Some(json!({"name": "Ada"}))).await;
        assert_eq!(user.status, StatusCode::CREATED, "{}", user.body);
        let chore = self
            .call(
                Method::POST,
                "/chores",
                Some(json!({"title": "Dishes", "cadence": "daily", "owner_id": user.body["id"]})),
            )
            .await;
        assert_eq!(chore.status, StatusCode::CREATED, "{}", chore.body);
        let assignment = self
            .call(
                Method::POST,
                "/assignments",
                Some(json!({
                    "user_id": user.body["id"],
                    "chore_id": chore.body["id"],
                    "due_at": "2030-01-01T09:00:00Z"
                })),
            )
            .await;
        assert_eq!(assignment.status, StatusCode::CREATED, "{}", assignment.body);
        assignment.body
    }

    pub async fn complete(&self, assignment_id: &Value) -> TestResponse {
        self.call(
            Method::PATCH,
            &format!("/assignments/{}", assignment_id),
            Some(json!({"status": "completed"})),
        )
        .await
    }
}

/// Assert the common problem document shape.
pub fn assert_problem(response: &TestResponse, status: StatusCode, code: &str) {
    assert_eq!(response.status, status, "{}", response.body);
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "application/problem+json",
        "{}",
        response.body
    );
    let body = &response.body;
    assert_eq!(body["status"], status.as_u16());
    assert_eq!(body["code"], code);
    assert!(body["title"].is_string());
    assert!(body["detail"].is_string());
    assert!(body["timestamp"].is_string());
    let correlation_id = body["correlation_id"].as_str().expect("correlation_id");
    assert_eq!(response.headers["x-correlation-id"], correlation_id);
}
