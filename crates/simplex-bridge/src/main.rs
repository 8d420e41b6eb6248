// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! simplex-bridge - SimpleX Chat bridge.
//!
//! This is the binary entry point: a standalone runner plus address helpers.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod framework;
mod run;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use simplex_bridge_config::BridgeConfig;
use simplex_bridge_core::BridgeError;

use crate::run::LoginTarget;

/// simplex-bridge - SimpleX Chat bridge.
#[derive(Parser, Debug)]
#[command(name = "simplex-bridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the usual locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to simplex-chat and log bridged events until interrupted.
    Run {
        /// WebSocket URL of a running simplex-chat.
        #[arg(long, conflicts_with = "managed_db")]
        ws_url: Option<String>,
        /// Start and manage simplex-chat with this database directory.
        #[arg(long)]
        managed_db: Option<PathBuf>,
    },
    /// Create the contact address of the active user.
    Address {
        #[arg(long)]
        ws_url: Option<String>,
        /// Accept incoming contact requests automatically.
        #[arg(long)]
        auto_accept: bool,
    },
    /// Join a group by ID.
    JoinGroup {
        #[arg(long)]
        ws_url: Option<String>,
        group_id: i64,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> BridgeConfig {
    let loaded = match path {
        Some(path) => simplex_bridge_config::load_and_validate_path(path),
        None => simplex_bridge_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            simplex_bridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn exit_on_error<T>(result: Result<T, BridgeError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{:?}", miette::miette!("{e}"));
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Commands::Run { ws_url, managed_db } => {
            run::init_tracing(&config.bridge.log_level);
            let target = exit_on_error(LoginTarget::resolve(&config, ws_url, managed_db));
            exit_on_error(run::run_bridge(config, target).await);
        }
        Commands::Address {
            ws_url,
            auto_accept,
        } => {
            run::init_tracing(&config.bridge.log_level);
            let link = exit_on_error(run::create_address(&config, ws_url, auto_accept).await);
            println!("{link}");
            if auto_accept {
                eprintln!("simplex-bridge: auto-accept enabled");
            }
        }
        Commands::JoinGroup { ws_url, group_id } => {
            run::init_tracing(&config.bridge.log_level);
            let name = exit_on_error(run::join_group(&config, ws_url, group_id).await);
            println!("joined group {group_id} ({name})");
        }
        Commands::CheckConfig => {
            println!(
                "simplex-bridge: config OK (ws_url={}, files_folder={})",
                config.simplex.ws_url.as_deref().unwrap_or("<unset>"),
                config.bridge.effective_files_folder().display()
            );
        }
    }
}
