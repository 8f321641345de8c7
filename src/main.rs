//! Feature flag server.
//!
//! # Usage
//!
//! ```bash
//! FLAGPOLE_ADMIN_TOKEN=secret cargo run
//! FLAGPOLE_ADMIN_TOKEN=secret cargo run -- --listen 127.0.0.1:9000 --snapshot /tmp/flags.json
//! ```
//!
//! ```bash
//! curl 'localhost:8080/flags/new-homepage?userId=123'
//! curl -X POST -H 'Authorization: Bearer secret' \
//!      -d '{"enabled": true, "targetRegions": ["us"]}' localhost:8080/flags/dark-mode
//! ```

use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use flagpole::{FlagService, ServerConfig, Snapshot};

/// Feature flag evaluation service.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "FLAGPOLE_LISTEN", default_value_t = SocketAddr::from(ServerConfig::DEFAULT_LISTEN_ADDR))]
    listen: SocketAddr,

    /// Flag snapshot file. Created on the first mutation if missing.
    #[arg(long, env = "FLAGPOLE_SNAPSHOT", default_value = ServerConfig::DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// Bearer token required for creating, updating and deleting flags.
    #[arg(long, env = "FLAGPOLE_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from_admin_token(args.admin_token)
        .listen_addr(args.listen)
        .snapshot_path(args.snapshot);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!(target: "flagpole", "{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), String> {
    let service = FlagService::open(Snapshot::new(&config.snapshot_path))
        .map_err(|err| format!("failed to load flags from {}: {err:?}", config.snapshot_path.display()))?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|err| format!("failed to bind {}: {err}", config.listen_addr))?;
    let addr = listener.local_addr().map_err(|err| err.to_string())?;

    log::info!(target: "flagpole", addr:display = addr; "starting feature flag service");

    let router = flagpole::api::router(Arc::new(service), config);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("server error: {err}"))?;

    log::info!(target: "flagpole", "feature flag service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!(target: "flagpole", "failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
