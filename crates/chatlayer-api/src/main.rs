//! chatlayer CLI and REST API entry point.
//!
//! Binary name: `chatlayer`
//!
//! Parses CLI arguments, initializes the database and chat service, then
//! dispatches to a command handler or starts the REST API server.

mod cleanup;
mod cli;
mod http;
mod state;

use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,chatlayer=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatlayer", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, host, port, cli.quiet).await?,

        Commands::Chats { offset, limit } => {
            cli::chat::list_chats(&state, offset, limit, cli.json).await?;
        }

        Commands::History {
            chat_id,
            offset,
            limit,
        } => {
            cli::chat::show_history(&state, &chat_id, offset, limit, cli.json).await?;
        }

        Commands::Delete { chat_id, force } => {
            cli::chat::delete_chat(&state, &chat_id, force, cli.json).await?;
        }

        Commands::SystemPrompt { chat_id, set } => {
            cli::chat::system_prompt(&state, &chat_id, set.as_deref(), cli.json).await?;
        }

        Commands::Usage {
            user_id,
            endpoint,
            hours,
        } => {
            cli::usage::show_usage(&state, &user_id, &endpoint, hours, cli.json).await?;
        }

        Commands::Cleanup { retention_hours } => {
            cli::usage::cleanup(&state, retention_hours, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>, quiet: bool) -> anyhow::Result<()> {
    if state.api_key_hash.is_none() {
        bail!("no API key configured; set CHATLAYER_API_KEY or [auth] api_key in config.toml");
    }

    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let cancel = CancellationToken::new();
    let cleanup = cleanup::spawn_cleanup_task(
        state.chat_service.clone(),
        Duration::from_secs(state.config.rate_limit.cleanup_interval_secs.max(1)),
        state.config.rate_limit.retention_hours,
        cancel.clone(),
    );

    if !quiet {
        println!(
            "  {} chatlayer API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }
    tracing::info!(
        %addr,
        model = %state.config.llm.model,
        limit = state.config.rate_limit.requests_per_hour,
        "Server started"
    );

    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    cleanup.await?;
    db_pool.close().await;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
