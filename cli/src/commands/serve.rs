// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `chore-tracker serve`

use anyhow::{Context, Result};
use std::path::PathBuf;

use chore_tracker_core::domain::service_config::ServiceConfig;

use crate::logging::{init_logging, LogFormat};
use crate::server;

/// Global flags that override the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.bind_address = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = ServiceConfig::load_or_default(args.config.clone())
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    let format: LogFormat = config.observability.log_format.parse()?;
    init_logging(&config.observability.log_level, format)?;

    server::run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = ServiceConfig::default();
        let args = ServeArgs {
            host: Some("0.0.0.0".to_string()),
            port: Some(9090),
            ..Default::default()
        };

        args.apply(&mut config);

        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.observability.log_level, "info");
    }
}
