// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Chore Tracker
//!
//! The `chore-tracker` binary serves the chore tracker HTTP API.
//!
//! ## Commands
//!
//! - `chore-tracker serve` - Run the HTTP API (default when no command is given)
//! - `chore-tracker config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chore_tracker::commands::{self, ConfigCommand, ServeArgs};
use chore_tracker::logging::{init_logging, LogFormat};

/// Chore Tracker - users, chores, assignments and completion webhooks
#[derive(Parser)]
#[command(name = "chore-tracker")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CHORE_TRACKER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: 8000)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// HTTP API host (default: 127.0.0.1)
    #[arg(long, global = true, env = "CHORE_TRACKER_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CHORE_TRACKER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Serve) | None => {
            let args = ServeArgs {
                config: cli.config,
                host: cli.host,
                port: cli.port,
                log_level: cli.log_level,
            };
            commands::serve::execute(args).await
        }
    }
}
