// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use chore_tracker_core::domain::service_config::{ServiceConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./chore-tracker.yaml)
        #[arg(short, long, default_value = "./chore-tracker.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./chore-tracker.yaml");
        println!("  4. ~/.chore-tracker/config.yaml");
        println!("  5. /etc/chore-tracker/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", config.server.bind_address, config.server.port);
    let api_key = if config.auth.api_key.is_some() {
        "(set)".green()
    } else {
        "(not set)".red()
    };
    println!("  API key: {}", api_key);
    println!();

    println!("{}", "Storage:".bold());
    println!("  Attachments: {}", config.storage.attachments_dir.display());
    println!("  Uploads: {}", config.storage.upload_dir.display());
    println!();

    println!("{}", "Webhooks:".bold());
    match &config.webhooks {
        None => println!("  {}", "(read from environment per call)".dimmed()),
        Some(webhooks) => {
            for (name, channel) in [("completion", &webhooks.completion), ("on_demand", &webhooks.on_demand)] {
                match channel.as_ref().and_then(|c| c.url.as_deref()) {
                    Some(url) => println!("  {}: {}", name.bold(), url),
                    None => println!("  {}: {}", name.bold(), "(disabled)".dimmed()),
                }
            }
        }
    }
    println!();

    println!("{}", "Observability:".bold());
    println!(
        "  Logging: {} ({})",
        config.observability.log_level, config.observability.log_format
    );
    match config.observability.metrics_port {
        Some(port) => println!("  Metrics port: {}", port),
        None => println!("  Metrics port: {}", "(disabled)".dimmed()),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn sample(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    std::fs::write(output, sample(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
