// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Webhook Delivery Client
//!
//! Anti-corruption layer around outbound HTTP for notifications. The
//! destination is validated against the allowlist before any socket is
//! opened; after that each attempt is a single JSON `POST` with its own
//! timeout, and failed attempts are retried with linear backoff.
//!
//! # Security Guarantees
//! - Rejected destinations never reach the transport and are never retried
//! - Redirects are not followed; a 3xx is treated as a failed attempt
//! - At most [`crate::domain::notification::MAX_UPSTREAM_EXCERPT_CHARS`] characters of an upstream body
//!   are carried back to callers
//!
//! The transport and the sleep between attempts are both traits so the
//! retry loop can be driven without a network or a clock.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::domain::destination::{validate_destination, AllowedHosts, Destination};
use crate::domain::notification::{
    upstream_excerpt, DeliveryFailureReason, NotificationError, NotificationPayload,
    MAX_RETRIES_CEILING,
};

/// Backoff unit; the sleep before attempt `n + 1` is `base * n`.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(200);

/// Upper bound on how much of an upstream response body is read.
const MAX_RESPONSE_READ_BYTES: usize = 4 * 1024;

/// One outbound attempt as seen by a transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub body: serde_json::Value,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    fn reason(&self) -> DeliveryFailureReason {
        match self {
            Self::Timeout(_) => DeliveryFailureReason::Timeout,
            Self::Connect(_) | Self::Other(_) => DeliveryFailureReason::Network,
        }
    }
}

/// Sends a single `POST`; retries are the caller's concern.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `reqwest` transport with redirects disabled.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("chore-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .post(request.url.clone())
            .timeout(request.timeout)
            .json(&request.body);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let mut response = builder.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();

        let mut raw = Vec::new();
        while raw.len() < MAX_RESPONSE_READ_BYTES {
            match response.chunk().await {
                Ok(Some(chunk)) => raw.extend_from_slice(&chunk),
                Ok(None) => break,
                // The status already arrived; an unreadable body only loses the excerpt.
                Err(e) => {
                    debug!(error = %e, "Failed to read webhook response body");
                    break;
                }
            }
        }
        raw.truncate(MAX_RESPONSE_READ_BYTES);

        Ok(TransportResponse {
            status,
            body: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

/// Everything a single delivery needs, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryRequest<'a> {
    pub url: &'a str,
    pub allowed_hosts: &'a AllowedHosts,
    pub payload: &'a NotificationPayload,
    pub bearer_token: Option<&'a str>,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub host: String,
    pub attempts: u32,
    pub status: u16,
}

#[derive(Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn WebhookTransport>,
    sleeper: Arc<dyn Sleeper>,
    backoff_base: Duration,
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn WebhookTransport>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport,
            sleeper,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Production client: `reqwest` transport and real sleeps.
    pub fn http() -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?), Arc::new(TokioSleeper)))
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Gate a destination without touching the network.
    pub fn validate(&self, url: &str, allowed_hosts: &AllowedHosts) -> Result<Destination, NotificationError> {
        validate_destination(url, allowed_hosts).map_err(|e| {
            metrics::counter!("webhook_rejections_total", "reason" => rejection_label(&e)).increment(1);
            NotificationError::from(e)
        })
    }

    /// Validate, then deliver with retries.
    pub async fn deliver(&self, request: DeliveryRequest<'_>) -> Result<DeliveryReceipt, NotificationError> {
        let destination = self.validate(request.url, request.allowed_hosts)?;
        self.deliver_to(
            destination,
            request.payload,
            request.bearer_token,
            request.timeout,
            request.max_retries,
        )
        .await
    }

    /// Deliver to an already validated destination.
    ///
    /// Makes up to `max_retries + 1` attempts, with `max_retries` capped at
    /// [`MAX_RETRIES_CEILING`]. Any non-2xx status counts as a failure
    /// exactly like a transport error.
    pub async fn deliver_to(
        &self,
        destination: Destination,
        payload: &NotificationPayload,
        bearer_token: Option<&str>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let body = serde_json::to_value(payload).map_err(|e| {
            error!(host = %destination.host, error = %e, "Failed to serialize webhook payload");
            NotificationError::DeliveryFailed {
                host: destination.host.clone(),
                attempts: 0,
                reason: DeliveryFailureReason::Network,
                upstream_status: None,
                upstream_excerpt: None,
            }
        })?;
        let request = OutboundRequest {
            url: destination.url,
            body,
            bearer_token: bearer_token.map(str::to_string),
            timeout,
        };

        let total_attempts = max_retries.min(MAX_RETRIES_CEILING) + 1;
        let mut last_failure = (DeliveryFailureReason::Network, None, None);

        for attempt in 1..=total_attempts {
            match self.transport.post(&request).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    metrics::counter!("webhook_delivery_attempts_total", "outcome" => "success").increment(1);
                    metrics::counter!("webhook_deliveries_total", "outcome" => "delivered").increment(1);
                    info!(
                        host = %destination.host,
                        attempt,
                        status = response.status,
                        "Webhook delivered"
                    );
                    return Ok(DeliveryReceipt {
                        host: destination.host,
                        attempts: attempt,
                        status: response.status,
                    });
                }
                Ok(response) => {
                    metrics::counter!("webhook_delivery_attempts_total", "outcome" => "bad_status").increment(1);
                    warn!(
                        host = %destination.host,
                        attempt,
                        total_attempts,
                        status = response.status,
                        "Webhook attempt returned non-success status"
                    );
                    last_failure = (
                        DeliveryFailureReason::BadStatus,
                        Some(response.status),
                        upstream_excerpt(&response.body),
                    );
                }
                Err(error) => {
                    let reason = error.reason();
                    metrics::counter!("webhook_delivery_attempts_total", "outcome" => reason.to_string()).increment(1);
                    warn!(
                        host = %destination.host,
                        attempt,
                        total_attempts,
                        error = %error,
                        "Webhook attempt failed"
                    );
                    last_failure = (reason, None, None);
                }
            }

            if attempt < total_attempts {
                self.sleeper.sleep(self.backoff_base * attempt).await;
            }
        }

        metrics::counter!("webhook_deliveries_total", "outcome" => "failed").increment(1);
        let (reason, upstream_status, upstream_excerpt) = last_failure;
        warn!(
            host = %destination.host,
            attempts = total_attempts,
            reason = %reason,
            upstream_status = ?upstream_status,
            upstream_excerpt = upstream_excerpt.as_deref().unwrap_or(""),
            "Webhook delivery exhausted retries"
        );
        Err(NotificationError::DeliveryFailed {
            host: destination.host,
            attempts: total_attempts,
            reason,
            upstream_status,
            upstream_excerpt,
        })
    }
}

fn rejection_label(error: &crate::domain::destination::DestinationError) -> &'static str {
    use crate::domain::destination::DestinationError;
    match error {
        DestinationError::InvalidScheme(_) => "invalid_scheme",
        DestinationError::MissingHost => "missing_host",
        DestinationError::HostNotAllowed(_) => "host_not_allowed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::MAX_UPSTREAM_EXCERPT_CHARS;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        calls: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
            self.calls.lock().push(request.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl WebhookTransport for PanickingTransport {
        async fn post(&self, _request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
            panic!("transport must not be reached");
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload {
            assignment_id: 1,
            user_id: 2,
            chore_id: 3,
            status: "completed".into(),
        }
    }

    fn ok(status: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            body: String::new(),
        })
    }

    fn request<'a>(
        url: &'a str,
        hosts: &'a AllowedHosts,
        payload: &'a NotificationPayload,
        max_retries: u32,
    ) -> DeliveryRequest<'a> {
        DeliveryRequest {
            url,
            allowed_hosts: hosts,
            payload,
            bearer_token: None,
            timeout: Duration::from_secs(1),
            max_retries,
        }
    }

    #[tokio::test]
    async fn test_rejection_never_reaches_transport() {
        let client = DeliveryClient::new(Arc::new(PanickingTransport), Arc::new(RecordingSleeper::default()));
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        for url in [
            "https://evil.example.net/x",
            "ftp://hooks.example.com/x",
            "https:///no-host",
            "http://169.254.169.254/latest/meta-data",
        ] {
            let err = client.deliver(request(url, &hosts, &payload, 3)).await.unwrap_err();
            assert!(err.is_configuration(), "{url}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_success_after_retry_sleeps_once() {
        let transport = ScriptedTransport::new(vec![ok(500), ok(204)]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = DeliveryClient::new(transport.clone(), sleeper.clone());
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let receipt = client
            .deliver(request("https://hooks.example.com/done", &hosts, &payload, 2))
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 2);
        assert_eq!(receipt.status, 204);
        assert_eq!(*sleeper.sleeps.lock(), vec![DEFAULT_BACKOFF_BASE]);
        let calls = transport.calls.lock();
        assert_eq!(calls[0].body["status"], "completed");
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_failure_without_trailing_sleep() {
        let long_body = "x".repeat(1_000);
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout("slow".into())),
            Err(TransportError::Connect("refused".into())),
            Ok(TransportResponse {
                status: 503,
                body: long_body,
            }),
        ]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = DeliveryClient::new(transport.clone(), sleeper.clone());
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let err = client
            .deliver(request("https://hooks.example.com/done", &hosts, &payload, 2))
            .await
            .unwrap_err();

        match err {
            NotificationError::DeliveryFailed {
                host,
                attempts,
                reason,
                upstream_status,
                upstream_excerpt,
            } => {
                assert_eq!(host, "hooks.example.com");
                assert_eq!(attempts, 3);
                assert_eq!(reason, DeliveryFailureReason::BadStatus);
                assert_eq!(upstream_status, Some(503));
                assert_eq!(upstream_excerpt.unwrap().len(), MAX_UPSTREAM_EXCERPT_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls.lock().len(), 3);
        assert_eq!(
            *sleeper.sleeps.lock(),
            vec![DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_BASE * 2]
        );
    }

    #[tokio::test]
    async fn test_retries_are_capped_at_ceiling() {
        let transport = ScriptedTransport::new((0..50).map(|_| ok(500)).collect());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = DeliveryClient::new(transport.clone(), sleeper.clone());
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let err = client
            .deliver(request("https://hooks.example.com/done", &hosts, &payload, u32::MAX))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotificationError::DeliveryFailed { attempts, .. } if attempts == MAX_RETRIES_CEILING + 1
        ));
        assert_eq!(transport.calls.lock().len(), (MAX_RETRIES_CEILING + 1) as usize);
        assert_eq!(sleeper.sleeps.lock().len(), MAX_RETRIES_CEILING as usize);
    }

    #[tokio::test]
    async fn test_transport_failure_carries_no_excerpt() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse {
                status: 500,
                body: "upstream broke".into(),
            }),
            Err(TransportError::Connect("refused".into())),
        ]);
        let client = DeliveryClient::new(transport, Arc::new(RecordingSleeper::default()));
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let err = client
            .deliver(request("https://hooks.example.com/done", &hosts, &payload, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::DeliveryFailed {
                upstream_status: None,
                upstream_excerpt: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_redirect_status_is_a_failure() {
        let transport = ScriptedTransport::new(vec![ok(302)]);
        let client = DeliveryClient::new(transport, Arc::new(RecordingSleeper::default()));
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let err = client
            .deliver(request("http://hooks.example.com/done", &hosts, &payload, 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::DeliveryFailed { attempts: 1, upstream_status: Some(302), .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_reason_is_kept_when_last() {
        let transport = ScriptedTransport::new(vec![ok(500), Err(TransportError::Timeout("slow".into()))]);
        let client = DeliveryClient::new(transport, Arc::new(RecordingSleeper::default()));
        let hosts = AllowedHosts::new(["hooks.example.com"]);
        let payload = payload();

        let err = client
            .deliver(request("https://hooks.example.com/done", &hosts, &payload, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::DeliveryFailed {
                reason: DeliveryFailureReason::Timeout,
                upstream_status: None,
                ..
            }
        ));
    }
}
