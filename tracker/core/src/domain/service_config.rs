// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the YAML configuration schema for the tracker service:
// - HTTP bind address and port
// - Shared API key (supports "env:VAR_NAME" indirection)
// - Attachment and upload directories
// - Logging and metrics settings
// - Optional static webhook channels (otherwise read from env per call)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::destination::{host_of, AllowedHosts};
use crate::domain::notification::{
    timeout_from_seconds, NotificationChannel, WebhookConfig, MAX_RETRIES_CEILING,
};

pub const CONFIG_PATH_ENV: &str = "CHORE_TRACKER_CONFIG_PATH";
pub const API_KEY_ENV: &str = "APP_API_KEY";
pub const ATTACHMENTS_DIR_ENV: &str = "ATTACHMENTS_DIR";
pub const UPLOAD_DIR_ENV: &str = "UPLOAD_DIR";
pub const PORT_ENV: &str = "CHORE_TRACKER_PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Static webhook channels. When absent, channels are read from the
    /// process environment on every call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhooks: Option<WebhooksConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret expected in `X-API-Key` (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: PathBuf,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Prometheus exporter port; disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhooksConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<WebhookChannelConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_demand: Option<WebhookChannelConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Bearer token (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl WebhookChannelConfig {
    /// Resolve into the runtime form, falling back to channel defaults.
    pub fn to_webhook_config(&self, channel: NotificationChannel) -> anyhow::Result<WebhookConfig> {
        let bearer_token = match &self.bearer_token {
            Some(token) => Some(resolve_secret(token)?),
            None => None,
        };
        Ok(WebhookConfig {
            url: self.url.clone().filter(|u| !u.trim().is_empty()),
            allowed_hosts: AllowedHosts::new(&self.allowed_hosts),
            timeout: self
                .timeout_seconds
                .and_then(timeout_from_seconds)
                .unwrap_or_else(|| channel.default_timeout()),
            max_retries: self
                .max_retries
                .unwrap_or_else(|| channel.default_max_retries())
                .min(MAX_RETRIES_CEILING),
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
        })
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("attachments")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachments_dir: default_attachments_dir(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}

/// Resolve a secret value (supports "env:VAR_NAME" syntax)
pub fn resolve_secret(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
        None => Ok(value.to_string()),
    }
}

impl ServiceConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. CHORE_TRACKER_CONFIG_PATH environment variable
    /// 2. ./chore-tracker.yaml (working directory)
    /// 3. ~/.chore-tracker/config.yaml (user home)
    /// 4. /etc/chore-tracker/config.yaml (Unix only)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./chore-tracker.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".chore-tracker").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/chore-tracker/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Self::apply_env_overrides`] with an explicit lookup
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}=<redacted>", API_KEY_ENV);
            self.auth.api_key = Some(key);
        }
        if let Some(dir) = lookup(ATTACHMENTS_DIR_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", ATTACHMENTS_DIR_ENV, dir);
            self.storage.attachments_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(UPLOAD_DIR_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", UPLOAD_DIR_ENV, dir);
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(PORT_ENV) {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(
                    "Invalid value for {}: '{}'. Expected a port number. Ignoring.",
                    PORT_ENV,
                    raw
                ),
            }
        }
    }

    /// Resolved API key, if one is configured
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        match &self.auth.api_key {
            Some(key) => Ok(Some(resolve_secret(key)?).filter(|k| !k.is_empty())),
            None => Ok(None),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port cannot be 0");
        }

        if self.server.bind_address.trim().is_empty() {
            anyhow::bail!("server.bind_address cannot be empty");
        }

        if !matches!(self.observability.log_format.as_str(), "compact" | "json") {
            anyhow::bail!(
                "Invalid observability.log_format: '{}'. Must be 'compact' or 'json'",
                self.observability.log_format
            );
        }

        if let Some(webhooks) = &self.webhooks {
            for (name, channel) in [("completion", &webhooks.completion), ("on_demand", &webhooks.on_demand)] {
                let Some(channel) = channel else { continue };
                if let Some(secs) = channel.timeout_seconds {
                    if timeout_from_seconds(secs).is_none() {
                        anyhow::bail!("webhooks.{}.timeout_seconds must be a positive number", name);
                    }
                }
                if channel.max_retries.is_some_and(|n| n > MAX_RETRIES_CEILING) {
                    anyhow::bail!(
                        "webhooks.{}.max_retries cannot exceed {}",
                        name,
                        MAX_RETRIES_CEILING
                    );
                }
                if let Some(url) = channel.url.as_deref().filter(|u| !u.trim().is_empty()) {
                    if channel.allowed_hosts.is_empty() && host_of(url).is_none() {
                        anyhow::bail!(
                            "webhooks.{}.url has no host and allowed_hosts is empty",
                            name
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = ServiceConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert!(config.webhooks.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip_with_webhooks() {
        let yaml = r#"
server:
  port: 9100
auth:
  api_key: secret
webhooks:
  completion:
    url: https://hooks.example.com/done
    allowed_hosts: ["Hooks.Example.com"]
    timeout_seconds: 0.5
    max_retries: 3
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();

        let completion = config.webhooks.as_ref().unwrap().completion.as_ref().unwrap();
        let runtime = completion.to_webhook_config(NotificationChannel::Completion).unwrap();
        assert!(runtime.allowed_hosts.contains("hooks.example.com"));
        assert_eq!(runtime.timeout, Duration::from_millis(500));
        assert_eq!(runtime.max_retries, 3);
        assert_eq!(runtime.bearer_token, None);

        let reparsed = ServiceConfig::from_yaml_str(&config.to_yaml_string().unwrap()).unwrap();
        assert_eq!(reparsed.server.port, 9100);
    }

    #[test]
    fn test_validation_rejects_bad_timeout() {
        let yaml = r#"
webhooks:
  on_demand:
    url: https://hooks.example.com/x
    timeout_seconds: -2
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_excessive_retries() {
        let yaml = r#"
webhooks:
  completion:
    url: https://hooks.example.com/x
    max_retries: 500
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let completion = config.webhooks.as_ref().unwrap().completion.as_ref().unwrap();
        let runtime = completion.to_webhook_config(NotificationChannel::Completion).unwrap();
        assert_eq!(runtime.max_retries, MAX_RETRIES_CEILING);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (API_KEY_ENV, "from-env"),
            (UPLOAD_DIR_ENV, "/tmp/up"),
            (PORT_ENV, "not-a-port"),
        ]);
        let mut config = ServiceConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.resolved_api_key().unwrap().as_deref(), Some("from-env"));
        assert_eq!(config.storage.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(config.server.port, 8000);
    }
}
