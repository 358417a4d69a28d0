// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Notification Orchestrator
//!
//! Decides whether an assignment event should produce a webhook, reads the
//! channel configuration at call time, and hands the call to the
//! [`DeliveryClient`].
//!
//! # Flow
//!
//! 1. Check the trigger (completion channel: `non-completed -> completed` only)
//! 2. Load the channel's [`WebhookConfig`] from the configured source
//! 3. Resolve the effective allowlist (configured hosts, else the URL's own host)
//! 4. Validate the destination synchronously
//! 5. Deliver inline (completion) or on a background task (on demand)

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::assignment::{Assignment, AssignmentStatus, StatusTransition};
use crate::domain::destination::{host_of, AllowedHosts};
use crate::domain::notification::{
    NotificationChannel, NotificationError, NotificationPayload, WebhookConfig,
};
use crate::infrastructure::webhook_client::{DeliveryClient, DeliveryReceipt, DeliveryRequest};
use crate::infrastructure::webhook_config::WebhookConfigSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The write did not move the assignment into `completed`.
    NotACompletion,
    /// The channel has no destination URL.
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered(DeliveryReceipt),
    Skipped(SkipReason),
}

#[derive(Clone)]
pub struct NotificationService {
    source: Arc<dyn WebhookConfigSource>,
    client: DeliveryClient,
}

impl NotificationService {
    pub fn new(source: Arc<dyn WebhookConfigSource>, client: DeliveryClient) -> Self {
        Self { source, client }
    }

    /// Notify the completion channel if `assignment` just entered `completed`.
    ///
    /// Runs inline; an error here must abort the status change.
    pub async fn notify_on_completion(
        &self,
        assignment: &Assignment,
        previous: AssignmentStatus,
    ) -> Result<NotificationOutcome, NotificationError> {
        if !StatusTransition::new(previous, assignment.status).enters_completed() {
            return Ok(NotificationOutcome::Skipped(SkipReason::NotACompletion));
        }

        let config = self.source.load(NotificationChannel::Completion);
        let Some(url) = configured_url(&config) else {
            debug!(assignment_id = %assignment.id, "Completion webhook not configured; skipping");
            return Ok(NotificationOutcome::Skipped(SkipReason::NotConfigured));
        };

        let allowed_hosts = effective_allowlist(url, &config.allowed_hosts)?;
        let payload = NotificationPayload::from(assignment);
        let receipt = self
            .client
            .deliver(DeliveryRequest {
                url,
                allowed_hosts: &allowed_hosts,
                payload: &payload,
                bearer_token: config.bearer_token.as_deref(),
                timeout: config.timeout,
                max_retries: config.max_retries,
            })
            .await?;

        info!(
            assignment_id = %assignment.id,
            host = %receipt.host,
            attempts = receipt.attempts,
            "Completion webhook delivered"
        );
        Ok(NotificationOutcome::Delivered(receipt))
    }

    /// Queue an on-demand notification for `assignment`.
    ///
    /// Configuration and destination problems are returned immediately.
    /// Delivery itself runs on a spawned task whose failures are only
    /// logged; the handle is returned for callers that want to await it.
    pub fn notify_now(
        &self,
        assignment: &Assignment,
    ) -> Result<JoinHandle<Result<DeliveryReceipt, NotificationError>>, NotificationError> {
        let config = self.source.load(NotificationChannel::OnDemand);
        let url = configured_url(&config).ok_or(NotificationError::NotConfigured)?;
        let allowed_hosts = effective_allowlist(url, &config.allowed_hosts)?;
        let destination = self.client.validate(url, &allowed_hosts)?;

        let client = self.client.clone();
        let payload = NotificationPayload::from(assignment);
        let assignment_id = assignment.id;
        info!(%assignment_id, host = %destination.host, "On-demand notification queued");

        Ok(tokio::spawn(async move {
            let result = client
                .deliver_to(
                    destination,
                    &payload,
                    config.bearer_token.as_deref(),
                    config.timeout,
                    config.max_retries,
                )
                .await;
            match &result {
                Ok(receipt) => info!(
                    %assignment_id,
                    host = %receipt.host,
                    attempts = receipt.attempts,
                    "On-demand notification delivered"
                ),
                Err(e) => error!(%assignment_id, error = %e, "On-demand notification failed"),
            }
            result
        }))
    }
}

fn configured_url(config: &WebhookConfig) -> Option<&str> {
    config.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
}

/// Configured hosts, or a single-host list derived from `url` when none are
/// configured. Never allows everything.
pub fn effective_allowlist(url: &str, configured: &AllowedHosts) -> Result<AllowedHosts, NotificationError> {
    if !configured.is_empty() {
        return Ok(configured.clone());
    }
    match host_of(url) {
        Some(host) => Ok(AllowedHosts::new([host])),
        None => Err(NotificationError::EmptyAllowlist),
    }
}
