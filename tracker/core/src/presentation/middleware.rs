// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Request middleware: correlation ids, problem finalization, API key auth.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::presentation::problem::{ApiError, Problem};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

fn correlation_id_from(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Attach a correlation id to the request and echo it on the response.
///
/// Error responses carry their [`Problem`] as an extension; it is rendered
/// here once `instance` and `correlation_id` are known.
pub async fn correlation(mut request: Request, next: Next) -> Response {
    let correlation_id = correlation_id_from(request.headers());
    let path = request.uri().path().to_string();
    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));

    let mut response = next.run(request).await;

    if let Some(mut problem) = response.extensions_mut().remove::<Problem>() {
        problem.instance = path;
        problem.correlation_id = correlation_id.clone();
        let (mut parts, _) = response.into_parts();
        let rendered = problem.to_response();
        let (rendered_parts, body) = rendered.into_parts();
        parts.status = rendered_parts.status;
        parts.headers.extend(rendered_parts.headers);
        response = Response::from_parts(parts, body);
    }

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

/// Expected `X-API-Key` value; `None` means the server is misconfigured.
#[derive(Clone)]
pub struct ApiKey(pub Option<Arc<str>>);

pub async fn require_api_key(State(expected): State<ApiKey>, request: Request, next: Next) -> Response {
    let Some(expected) = expected.0.as_deref().filter(|k| !k.is_empty()) else {
        tracing::error!("Rejecting request: no API key configured");
        return ApiError::missing_api_key_config().into_response();
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !bool::from(provided.ct_eq(expected.as_bytes())) {
        tracing::debug!(path = %request.uri().path(), "Rejecting request with invalid API key");
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}

/// `CatchPanicLayer` handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "Request handler panicked");
    ApiError::internal().into_response()
}
