// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rill - a terminal client for streaming chat backends.
//!
//! This is the binary entry point for the rill client.

mod chat;
mod conversations;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rill_config::RillConfig;
use rill_core::RillError;
use rill_core::traits::transport::EventFeed;
use rill_http::{HttpBackend, SseFeed};
use rill_session::{ControllerConfig, SessionController};

/// Rill - a terminal client for streaming chat backends.
#[derive(Parser, Debug)]
#[command(name = "rill", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Open an interactive chat session.
    Chat {
        /// Resume an existing conversation by id.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// List conversations on the backend.
    Conversations,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match rill_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            rill_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    let result = match cli.command {
        Some(Commands::Conversations) => {
            run_with_controller(&config, conversations::run_conversations).await
        }
        Some(Commands::Chat { conversation }) => {
            run_with_controller(&config, |controller| {
                chat::run_chat(controller, config.clone(), conversation)
            })
            .await
        }
        None => {
            run_with_controller(&config, |controller| {
                chat::run_chat(controller, config.clone(), None)
            })
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("rill: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the backend stack from config and hands a controller to `run`.
async fn run_with_controller<F, Fut>(config: &RillConfig, run: F) -> Result<(), RillError>
where
    F: FnOnce(Arc<SessionController>) -> Fut,
    Fut: Future<Output = Result<(), RillError>>,
{
    let backend = Arc::new(HttpBackend::new(
        &config.backend.base_url,
        config.backend.api_token.as_deref(),
    )?);

    // Polling mode drops the push feed entirely and leans on the fallback.
    let feed: Option<Arc<dyn EventFeed>> = if config.transport.mode == "sse" {
        Some(Arc::new(SseFeed::new(
            &config.backend.base_url,
            config.backend.api_token.as_deref(),
        )?))
    } else {
        None
    };

    let controller_config = ControllerConfig {
        poll_interval: Duration::from_millis(config.transport.poll_interval_ms),
        polling_enabled: true,
        reconnect_base: Duration::from_millis(config.transport.reconnect_base_ms),
        reconnect_max: Duration::from_millis(config.transport.reconnect_max_ms),
    };

    let controller = Arc::new(SessionController::new(backend, feed, controller_config));
    let result = run(Arc::clone(&controller)).await;
    controller.teardown();
    result
}
