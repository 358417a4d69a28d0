// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Problem Documents
//!
//! Every error leaves the service as `application/problem+json`. Handlers
//! return [`ApiError`]; the correlation middleware fills in `instance` and
//! `correlation_id` and renders the final body.
//!
//! # Notification failures
//!
//! The two notification channels share one failure taxonomy but report it
//! under different codes:
//!
//! | Failure | Completion | On demand |
//! |---------|-----------|-----------|
//! | bad scheme | 400 `webhook_invalid_scheme` | 400 `notification_invalid_scheme` |
//! | host missing or blocked | 400 `webhook_host_blocked` | 400 `notification_host_blocked` |
//! | empty allowlist | 400 `webhook_config_invalid` | 400 `notification_config_invalid` |
//! | delivery exhausted | 502 `webhook_failed` | 504 (timeout) / 502 `notification_failed` |
//! | not configured | 503 `webhook_not_configured` | 503 `notification_not_configured` |

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::application::TrackerError;
use crate::domain::attachment::AttachmentError;
use crate::domain::destination::DestinationError;
use crate::domain::notification::{DeliveryFailureReason, NotificationChannel, NotificationError};
use crate::domain::upload::UploadError;
use crate::domain::validation::FieldError;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
pub const PROBLEM_TYPE_BASE: &str = "https://example.com/problems/";
pub const INTERNAL_ERROR_DETAIL: &str = "The server encountered an internal error";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
    pub correlation_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub code: String,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn serialize_timestamp<S: serde::Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, false))
}

impl Problem {
    /// A problem whose `type` is derived from `code`.
    pub fn new(status: StatusCode, code: &str, detail: impl Into<String>) -> Self {
        Self {
            type_: format!("{}{}", PROBLEM_TYPE_BASE, code.replace('_', "-")),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            correlation_id: String::new(),
            timestamp: Utc::now(),
            code: code.to_string(),
            extensions: Map::new(),
        }
    }

    /// Override the derived `type` with a specific slug.
    pub fn with_type(mut self, slug: &str) -> Self {
        self.type_ = format!("{}{}", PROBLEM_TYPE_BASE, slug);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.to_string(), value.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Render the document as a response.
    pub fn to_response(&self) -> Response {
        let body = serde_json::to_vec(self).unwrap_or_else(|_| b"{}".to_vec());
        let mut response = (self.status_code(), body).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_CONTENT_TYPE));
        response
    }
}

/// Error returned by every handler and extractor.
#[derive(Debug, Clone)]
pub struct ApiError(pub Problem);

impl ApiError {
    pub fn unauthorized() -> Self {
        Self(Problem::new(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid API key").with_type("invalid-api-key"))
    }

    pub fn missing_api_key_config() -> Self {
        Self(
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "config_error", "API key not configured")
                .with_type("configuration-error"),
        )
    }

    pub fn internal() -> Self {
        Self(Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            INTERNAL_ERROR_DETAIL,
        ))
    }

    pub fn validation(errors: &[FieldError]) -> Self {
        Self(
            Problem::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed",
            )
            .with("errors", serde_json::to_value(errors).unwrap_or_default()),
        )
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::validation(&[FieldError::new(field, message)])
    }

    /// Unmatched routes and methods; upstream details are never echoed.
    pub fn http(status: StatusCode) -> Self {
        Self(Problem::new(status, "http_error", "The request could not be processed"))
    }

    fn not_found(code: &str, detail: &str, slug: &str) -> Self {
        Self(Problem::new(StatusCode::NOT_FOUND, code, detail).with_type(slug))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.0.to_response();
        response.extensions_mut().insert(self.0);
        response
    }
}

impl From<TrackerError> for ApiError {
    fn from(error: TrackerError) -> Self {
        match error {
            TrackerError::Validation(errors) => Self::validation(&errors),
            TrackerError::UserNotFound(_) => Self::not_found("user_not_found", "User not found", "user-not-found"),
            TrackerError::ChoreNotFound(_) => Self::not_found("chore_not_found", "Chore not found", "chore-not-found"),
            TrackerError::AssignmentNotFound(_) => {
                Self::not_found("assignment_not_found", "Assignment not found", "assignment-not-found")
            }
            TrackerError::ItemNotFound(_) => Self::not_found("not_found", "Item not found", "item-not-found"),
            TrackerError::Notification { channel, source } => notification_problem(channel, &source),
            TrackerError::Attachment(e) => attachment_problem(e),
            TrackerError::Upload(e) => upload_problem(e),
            TrackerError::Repository(e) => {
                error!(error = %e, "Repository failure");
                Self::internal()
            }
        }
    }
}

/// Failure kinds shared by both notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    InvalidScheme,
    HostBlocked,
    ConfigInvalid,
    DeliveryTimeout,
    DeliveryFailed,
    NotConfigured,
}

impl FailureKind {
    fn of(error: &NotificationError) -> Self {
        match error {
            NotificationError::NotConfigured => Self::NotConfigured,
            NotificationError::Destination(DestinationError::InvalidScheme(_)) => Self::InvalidScheme,
            NotificationError::Destination(_) => Self::HostBlocked,
            NotificationError::EmptyAllowlist => Self::ConfigInvalid,
            NotificationError::DeliveryFailed {
                reason: DeliveryFailureReason::Timeout,
                ..
            } => Self::DeliveryTimeout,
            NotificationError::DeliveryFailed { .. } => Self::DeliveryFailed,
        }
    }
}

/// Status and code for every (channel, failure) pair.
fn notification_code(channel: NotificationChannel, kind: FailureKind) -> (StatusCode, &'static str) {
    use FailureKind::*;
    use NotificationChannel::*;
    match (channel, kind) {
        (Completion, InvalidScheme) => (StatusCode::BAD_REQUEST, "webhook_invalid_scheme"),
        (Completion, HostBlocked) => (StatusCode::BAD_REQUEST, "webhook_host_blocked"),
        (Completion, ConfigInvalid) => (StatusCode::BAD_REQUEST, "webhook_config_invalid"),
        (Completion, DeliveryTimeout | DeliveryFailed) => (StatusCode::BAD_GATEWAY, "webhook_failed"),
        (Completion, NotConfigured) => (StatusCode::SERVICE_UNAVAILABLE, "webhook_not_configured"),
        (OnDemand, InvalidScheme) => (StatusCode::BAD_REQUEST, "notification_invalid_scheme"),
        (OnDemand, HostBlocked) => (StatusCode::BAD_REQUEST, "notification_host_blocked"),
        (OnDemand, ConfigInvalid) => (StatusCode::BAD_REQUEST, "notification_config_invalid"),
        (OnDemand, DeliveryTimeout) => (StatusCode::GATEWAY_TIMEOUT, "notification_failed"),
        (OnDemand, DeliveryFailed) => (StatusCode::BAD_GATEWAY, "notification_failed"),
        (OnDemand, NotConfigured) => (StatusCode::SERVICE_UNAVAILABLE, "notification_not_configured"),
    }
}

fn notification_detail(channel: NotificationChannel, error: &NotificationError) -> &'static str {
    match (channel, error) {
        (NotificationChannel::Completion, NotificationError::NotConfigured) => "Webhook endpoint is not configured",
        (NotificationChannel::OnDemand, NotificationError::NotConfigured) => "Notification endpoint is not configured",
        (_, NotificationError::Destination(DestinationError::InvalidScheme(_))) => "Webhook scheme must be http or https",
        (_, NotificationError::Destination(DestinationError::MissingHost)) => "Webhook host missing",
        (_, NotificationError::Destination(DestinationError::HostNotAllowed(_))) => {
            "Destination host is not allow-listed"
        }
        (_, NotificationError::EmptyAllowlist) => "Webhook allowlist is empty",
        (NotificationChannel::Completion, NotificationError::DeliveryFailed { .. }) => "Failed to deliver webhook",
        (NotificationChannel::OnDemand, NotificationError::DeliveryFailed { .. }) => {
            "Notification could not be delivered"
        }
    }
}

pub fn notification_problem(channel: NotificationChannel, error: &NotificationError) -> ApiError {
    let (status, code) = notification_code(channel, FailureKind::of(error));
    let mut problem = Problem::new(status, code, notification_detail(channel, error));

    if let NotificationError::DeliveryFailed {
        host,
        attempts,
        reason,
        upstream_status,
        ..
    } = error
    {
        if channel == NotificationChannel::Completion {
            problem = problem.with_type("webhook-delivery-failed");
        }
        problem = problem
            .with("host", host.clone())
            .with("reason", reason.to_string())
            .with("attempts", *attempts);
        if let Some(upstream) = upstream_status {
            problem = problem.with("upstream_status", *upstream);
        }
    }
    ApiError(problem)
}

fn attachment_problem(error: AttachmentError) -> ApiError {
    let (status, code) = match &error {
        AttachmentError::Empty => (StatusCode::BAD_REQUEST, "attachment_empty"),
        AttachmentError::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "attachment_too_large"),
        AttachmentError::UnsupportedType => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "attachment_type_unsupported"),
        AttachmentError::InvalidEncoding => (StatusCode::BAD_REQUEST, "attachment_invalid_encoding"),
        AttachmentError::PathViolation => (StatusCode::BAD_REQUEST, "attachment_path_violation"),
        AttachmentError::SymlinkParent => (StatusCode::BAD_REQUEST, "attachment_symlink_parent"),
        AttachmentError::Io(e) => {
            error!(error = %e, "Attachment storage failure");
            return ApiError::internal();
        }
    };
    ApiError(Problem::new(status, code, error.to_string()))
}

fn upload_problem(error: UploadError) -> ApiError {
    let (status, code) = match &error {
        UploadError::MissingName | UploadError::BadName => (StatusCode::BAD_REQUEST, "upload_bad_name"),
        UploadError::MissingFile => return ApiError::field("file", "Field required"),
        UploadError::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "upload_too_large"),
        UploadError::BadType { received_type } => {
            return ApiError(
                Problem::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "upload_bad_type", error.to_string())
                    .with("received_type", received_type.clone()),
            );
        }
        UploadError::DirInvalid => (StatusCode::BAD_REQUEST, "upload_dir_invalid"),
        UploadError::PathTraversal | UploadError::SymlinkTraversal => (StatusCode::BAD_REQUEST, "upload_path_traversal"),
        UploadError::Multipart(_) => (StatusCode::BAD_REQUEST, "upload_malformed"),
        UploadError::Io(e) => {
            error!(error = %e, "Upload storage failure");
            return ApiError::internal();
        }
    };
    ApiError(Problem::new(status, code, error.to_string()))
}
