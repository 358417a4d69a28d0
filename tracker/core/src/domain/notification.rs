// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Notification Domain Types
//!
//! Configuration, payload and failure taxonomy for outbound completion
//! webhooks. Two channels exist:
//!
//! | Channel | Trigger | Error code prefix |
//! |---------|---------|-------------------|
//! | [`NotificationChannel::Completion`] | status change into `completed` | `webhook_` |
//! | [`NotificationChannel::OnDemand`] | `POST /assignments/{id}/notify` | `notification_` |
//!
//! Both share the same validator and delivery client; they differ only in
//! where their configuration comes from and how failures are reported.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::domain::assignment::Assignment;
use crate::domain::destination::{AllowedHosts, DestinationError};

/// Maximum number of response-body characters carried in a failure.
pub const MAX_UPSTREAM_EXCERPT_CHARS: usize = 200;

/// Highest retry count any configuration source may set.
pub const MAX_RETRIES_CEILING: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Completion,
    OnDemand,
}

impl NotificationChannel {
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Completion => Duration::from_secs(2),
            Self::OnDemand => Duration::from_secs(5),
        }
    }

    pub fn default_max_retries(&self) -> u32 {
        match self {
            Self::Completion => 1,
            Self::OnDemand => 2,
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => f.write_str("completion"),
            Self::OnDemand => f.write_str("on_demand"),
        }
    }
}

/// Webhook settings for one channel, as read at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    /// `None` disables the channel.
    pub url: Option<String>,
    pub allowed_hosts: AllowedHosts,
    pub timeout: Duration,
    pub max_retries: u32,
    pub bearer_token: Option<String>,
}

impl WebhookConfig {
    /// A disabled channel with that channel's default timeout and retries.
    pub fn disabled(channel: NotificationChannel) -> Self {
        Self {
            url: None,
            allowed_hosts: AllowedHosts::default(),
            timeout: channel.default_timeout(),
            max_retries: channel.default_max_retries(),
            bearer_token: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// JSON body delivered to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub assignment_id: u64,
    pub user_id: u64,
    pub chore_id: u64,
    pub status: String,
}

impl From<&Assignment> for NotificationPayload {
    fn from(assignment: &Assignment) -> Self {
        Self {
            assignment_id: assignment.id.0,
            user_id: assignment.user_id.0,
            chore_id: assignment.chore_id.0,
            status: assignment.status.as_str().to_string(),
        }
    }
}

/// Coarse classification of why the last delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailureReason {
    Timeout,
    Network,
    BadStatus,
}

impl fmt::Display for DeliveryFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Network => f.write_str("network"),
            Self::BadStatus => f.write_str("bad_status"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Notification endpoint is not configured")]
    NotConfigured,

    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error("Webhook allowlist is empty and no host could be derived from the URL")]
    EmptyAllowlist,

    #[error("Delivery to {host} failed after {attempts} attempt(s): {reason}")]
    DeliveryFailed {
        host: String,
        attempts: u32,
        reason: DeliveryFailureReason,
        upstream_status: Option<u16>,
        /// At most [`MAX_UPSTREAM_EXCERPT_CHARS`] characters of the last response body.
        upstream_excerpt: Option<String>,
    },
}

impl NotificationError {
    /// Configuration-class failures are the caller's to fix and never retried.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::DeliveryFailed { .. })
    }
}

/// Convert a configured number of seconds into a timeout.
///
/// Non-finite, zero and negative values are rejected so the caller falls
/// back to the channel default.
pub fn timeout_from_seconds(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

/// Truncate an upstream body to the excerpt limit on a char boundary.
pub fn upstream_excerpt(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_UPSTREAM_EXCERPT_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::{AssignmentId, AssignmentStatus};
    use crate::domain::chore::ChoreId;
    use crate::domain::user::UserId;
    use chrono::Utc;

    #[test]
    fn test_payload_uses_plain_status_string() {
        let assignment = Assignment {
            id: AssignmentId(7),
            user_id: UserId(2),
            chore_id: ChoreId(3),
            due_at: Utc::now(),
            status: AssignmentStatus::Completed,
        };
        let body = serde_json::to_value(NotificationPayload::from(&assignment)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"assignment_id": 7, "user_id": 2, "chore_id": 3, "status": "completed"})
        );
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let body = "é".repeat(500);
        let excerpt = upstream_excerpt(&body).unwrap();
        assert_eq!(excerpt.chars().count(), MAX_UPSTREAM_EXCERPT_CHARS);
        assert_eq!(upstream_excerpt("   "), None);
    }

    #[test]
    fn test_retry_ceiling_covers_channel_defaults() {
        for channel in [NotificationChannel::Completion, NotificationChannel::OnDemand] {
            assert!(channel.default_max_retries() <= MAX_RETRIES_CEILING);
        }
    }

    #[test]
    fn test_timeout_from_seconds() {
        assert_eq!(timeout_from_seconds(0.5), Some(Duration::from_millis(500)));
        assert_eq!(timeout_from_seconds(0.0), None);
        assert_eq!(timeout_from_seconds(-1.0), None);
        assert_eq!(timeout_from_seconds(f64::NAN), None);
        assert_eq!(timeout_from_seconds(f64::INFINITY), None);
    }

    #[test]
    fn test_disabled_config_uses_channel_defaults() {
        let config = WebhookConfig::disabled(NotificationChannel::Completion);
        assert!(!config.is_enabled());
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.max_retries, 1);
        assert_eq!(WebhookConfig::disabled(NotificationChannel::OnDemand).max_retries, 2);
    }
}
