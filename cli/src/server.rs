// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server bootstrap
//!
//! Wires the in-memory services from a [`ServiceConfig`], optionally starts
//! the Prometheus exporter, and serves the API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use chore_tracker_core::domain::notification::NotificationChannel;
use chore_tracker_core::domain::service_config::ServiceConfig;
use chore_tracker_core::infrastructure::{
    DeliveryClient, EnvWebhookConfigSource, StaticWebhookConfigSource, WebhookConfigSource,
};
use chore_tracker_core::presentation::{router, ApiSettings, AppState};

/// Build application state from configuration.
pub fn build_state(config: &ServiceConfig) -> Result<AppState> {
    let api_key = config
        .resolved_api_key()
        .context("Failed to resolve auth.api_key")?;
    if api_key.is_none() {
        warn!("No API key configured; protected routes will answer 500 config_error");
    }

    let delivery = DeliveryClient::http().context("Failed to build webhook HTTP client")?;
    let settings = ApiSettings {
        api_key,
        attachments_dir: config.storage.attachments_dir.clone(),
        upload_dir: config.storage.upload_dir.clone(),
    };

    Ok(AppState::in_memory(settings, webhook_source(config)?, delivery))
}

/// Webhook channels come from the `webhooks` section when present, otherwise
/// from the process environment on every call.
pub fn webhook_source(config: &ServiceConfig) -> Result<Arc<dyn WebhookConfigSource>> {
    let Some(webhooks) = &config.webhooks else {
        info!("Webhook channels will be read from the environment");
        return Ok(Arc::new(EnvWebhookConfigSource::new()));
    };

    let source = StaticWebhookConfigSource::new();
    for (channel, section) in [
        (NotificationChannel::Completion, &webhooks.completion),
        (NotificationChannel::OnDemand, &webhooks.on_demand),
    ] {
        if let Some(section) = section {
            let resolved = section
                .to_webhook_config(channel)
                .with_context(|| format!("Invalid webhook configuration for {:?}", channel))?;
            info!(?channel, enabled = resolved.is_enabled(), "Webhook channel configured from file");
            source.set(channel, resolved);
        }
    }
    Ok(Arc::new(source))
}

fn install_metrics_exporter(bind_address: &str, port: u16) -> Result<()> {
    let ip: IpAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address for metrics listener: {}", bind_address))?;
    let addr = SocketAddr::new(ip, port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(%addr, "Prometheus metrics listener started");
    Ok(())
}

pub async fn run(config: ServiceConfig) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let state = build_state(&config)?;

    if let Some(port) = config.observability.metrics_port {
        install_metrics_exporter(&config.server.bind_address, port)?;
    }

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Chore tracker listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Chore tracker shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
