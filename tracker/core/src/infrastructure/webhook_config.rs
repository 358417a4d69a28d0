// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Webhook configuration sources.
//!
//! Configuration is looked up on every notification, never cached, so an
//! operator can change a destination without restarting the service.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::domain::destination::AllowedHosts;
use crate::domain::notification::{
    timeout_from_seconds, NotificationChannel, WebhookConfig, MAX_RETRIES_CEILING,
};

/// Supplies the current [`WebhookConfig`] for a channel.
pub trait WebhookConfigSource: Send + Sync {
    fn load(&self, channel: NotificationChannel) -> WebhookConfig;
}

/// Environment variable names for one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelEnvKeys {
    pub url: &'static str,
    pub allowed_hosts: &'static str,
    pub timeout_seconds: &'static str,
    pub max_retries: &'static str,
    pub token: &'static str,
}

pub const COMPLETION_ENV_KEYS: ChannelEnvKeys = ChannelEnvKeys {
    url: "ASSIGNMENT_WEBHOOK_URL",
    allowed_hosts: "ASSIGNMENT_WEBHOOK_ALLOWLIST",
    timeout_seconds: "ASSIGNMENT_WEBHOOK_TIMEOUT_SECONDS",
    max_retries: "ASSIGNMENT_WEBHOOK_MAX_RETRIES",
    token: "ASSIGNMENT_WEBHOOK_TOKEN",
};

pub const ON_DEMAND_ENV_KEYS: ChannelEnvKeys = ChannelEnvKeys {
    url: "NOTIFY_WEBHOOK_URL",
    allowed_hosts: "NOTIFY_ALLOWED_HOSTS",
    timeout_seconds: "NOTIFY_TIMEOUT_SECONDS",
    max_retries: "NOTIFY_MAX_RETRIES",
    token: "NOTIFY_TOKEN",
};

impl ChannelEnvKeys {
    pub fn for_channel(channel: NotificationChannel) -> Self {
        match channel {
            NotificationChannel::Completion => COMPLETION_ENV_KEYS,
            NotificationChannel::OnDemand => ON_DEMAND_ENV_KEYS,
        }
    }
}

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Reads the process environment on every call.
pub struct EnvWebhookConfigSource {
    lookup: Box<Lookup>,
}

impl EnvWebhookConfigSource {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Use an arbitrary key lookup in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl Default for EnvWebhookConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookConfigSource for EnvWebhookConfigSource {
    fn load(&self, channel: NotificationChannel) -> WebhookConfig {
        let keys = ChannelEnvKeys::for_channel(channel);

        let timeout = match self.get(keys.timeout_seconds) {
            Some(raw) => match raw.parse::<f64>().ok().and_then(timeout_from_seconds) {
                Some(timeout) => timeout,
                None => {
                    warn!(
                        "Invalid value for {}: '{}'. Using default {:?}.",
                        keys.timeout_seconds,
                        raw,
                        channel.default_timeout()
                    );
                    channel.default_timeout()
                }
            },
            None => channel.default_timeout(),
        };

        let max_retries = match self.get(keys.max_retries) {
            Some(raw) => raw.parse::<u32>().unwrap_or_else(|_| {
                warn!(
                    "Invalid value for {}: '{}'. Using default {}.",
                    keys.max_retries,
                    raw,
                    channel.default_max_retries()
                );
                channel.default_max_retries()
            }),
            None => channel.default_max_retries(),
        };
        let max_retries = if max_retries > MAX_RETRIES_CEILING {
            warn!(
                "{} of {} exceeds the ceiling. Using {}.",
                keys.max_retries, max_retries, MAX_RETRIES_CEILING
            );
            MAX_RETRIES_CEILING
        } else {
            max_retries
        };

        WebhookConfig {
            url: self.get(keys.url),
            allowed_hosts: self
                .get(keys.allowed_hosts)
                .map(|raw| AllowedHosts::from_csv(&raw))
                .unwrap_or_default(),
            timeout,
            max_retries,
            bearer_token: self.get(keys.token),
        }
    }
}

/// In-memory source; channels without an entry are disabled.
#[derive(Clone, Default)]
pub struct StaticWebhookConfigSource {
    channels: Arc<RwLock<HashMap<NotificationChannel, WebhookConfig>>>,
}

impl StaticWebhookConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, channel: NotificationChannel, config: WebhookConfig) {
        self.channels.write().insert(channel, config);
    }

    pub fn clear(&self, channel: NotificationChannel) {
        self.channels.write().remove(&channel);
    }
}

impl WebhookConfigSource for StaticWebhookConfigSource {
    fn load(&self, channel: NotificationChannel) -> WebhookConfig {
        self.channels
            .read()
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| WebhookConfig::disabled(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env(pairs: &[(&'static str, &'static str)]) -> EnvWebhookConfigSource {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvWebhookConfigSource::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_env_source_reads_completion_channel() {
        let source = env(&[
            ("ASSIGNMENT_WEBHOOK_URL", " https://hooks.example.com/done "),
            ("ASSIGNMENT_WEBHOOK_ALLOWLIST", "Hooks.Example.com, other.example.com ,,"),
            ("ASSIGNMENT_WEBHOOK_TIMEOUT_SECONDS", "0.25"),
            ("ASSIGNMENT_WEBHOOK_MAX_RETRIES", "4"),
            ("ASSIGNMENT_WEBHOOK_TOKEN", "s3cret"),
        ]);
        let config = source.load(NotificationChannel::Completion);

        assert_eq!(config.url.as_deref(), Some("https://hooks.example.com/done"));
        assert!(config.allowed_hosts.contains("hooks.example.com"));
        assert!(config.allowed_hosts.contains("other.example.com"));
        assert_eq!(config.allowed_hosts.iter().count(), 2);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.bearer_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_env_source_falls_back_on_unparseable_values() {
        let source = env(&[
            ("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/n"),
            ("NOTIFY_TIMEOUT_SECONDS", "soon"),
            ("NOTIFY_MAX_RETRIES", "-1"),
            ("NOTIFY_TOKEN", "   "),
        ]);
        let config = source.load(NotificationChannel::OnDemand);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.bearer_token, None);
        assert!(config.allowed_hosts.is_empty());
    }

    #[test]
    fn test_env_source_clamps_retries_to_ceiling() {
        let source = env(&[
            ("ASSIGNMENT_WEBHOOK_URL", "https://hooks.example.com/done"),
            ("ASSIGNMENT_WEBHOOK_MAX_RETRIES", "4000000000"),
            ("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/n"),
            ("NOTIFY_MAX_RETRIES", "10"),
        ]);
        assert_eq!(
            source.load(NotificationChannel::Completion).max_retries,
            MAX_RETRIES_CEILING
        );
        assert_eq!(source.load(NotificationChannel::OnDemand).max_retries, 10);
    }

    #[test]
    fn test_channels_are_independent() {
        let source = env(&[("ASSIGNMENT_WEBHOOK_URL", "https://hooks.example.com/done")]);
        assert!(source.load(NotificationChannel::Completion).is_enabled());
        assert!(!source.load(NotificationChannel::OnDemand).is_enabled());
    }

    #[test]
    fn test_static_source_is_settable() {
        let source = StaticWebhookConfigSource::new();
        assert!(!source.load(NotificationChannel::Completion).is_enabled());

        let mut config = WebhookConfig::disabled(NotificationChannel::Completion);
        config.url = Some("https://hooks.example.com/done".into());
        source.set(NotificationChannel::Completion, config.clone());
        assert_eq!(source.load(NotificationChannel::Completion), config);

        source.clear(NotificationChannel::Completion);
        assert!(!source.load(NotificationChannel::Completion).is_enabled());
    }
}
