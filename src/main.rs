//! live-poll - main binary
//!
//! Serves the poll API and the live result streams.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  HTTP / SSE  ┌────────────────┐  blocking pool  ┌──────────┐
//! │    Browsers    │ ◀──────────▶ │  Axum server   │ ──────────────▶ │  SQLite  │
//! └────────────────┘              └────────────────┘                 └──────────┘
//! ```
//!
//! Every option can be given as a flag or an environment variable, e.g.
//! `POLL_PORT=8080 POLL_ENV=production live-poll --db-path /var/lib/poll.db`.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use server::{Environment, LiveHub, RateLimitConfig, ServerConfig, ServerState, create_app};
use storage::{PollStore, StorageConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// live-poll - Create a poll, share the link, watch the votes come in live
#[derive(Parser, Debug)]
#[command(name = "live-poll")]
#[command(about = "Real-time polling server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "POLL_PORT", default_value_t = 3000)]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "POLL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// SQLite database file (`:memory:` for a throwaway store)
    #[arg(long, env = "POLL_DB_PATH", default_value = "data/polls.db")]
    db_path: String,

    /// Allowed browser origin(s), comma separated, or `*`
    #[arg(long, env = "POLL_CORS_ORIGIN", default_value = "http://localhost:5173")]
    cors_origin: String,

    /// Public base URL used in share links
    #[arg(long, env = "POLL_PUBLIC_URL")]
    public_url: Option<String>,

    /// development or production
    #[arg(long = "env", env = "POLL_ENV", default_value = "development")]
    environment: Environment,

    /// Trust X-Forwarded-For / X-Forwarded-Proto from one reverse proxy
    #[arg(long, env = "POLL_TRUST_PROXY")]
    trust_proxy: bool,

    /// Enforce per-IP vote and poll creation limits
    #[arg(long, env = "POLL_RATE_LIMIT", default_value_t = true, action = ArgAction::Set)]
    rate_limit: bool,

    /// Seconds between stream heartbeats
    #[arg(long, env = "POLL_HEARTBEAT_SECS", default_value_t = 30)]
    heartbeat_secs: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let rate_limit = if self.rate_limit {
            RateLimitConfig::default()
        } else {
            RateLimitConfig::disabled()
        };

        ServerConfig {
            port: self.port,
            host: self.host.clone(),
            cors_origin: self.cors_origin.clone(),
            public_url: self.public_url.clone(),
            environment: self.environment,
            trust_proxy: self.trust_proxy,
            rate_limit,
            heartbeat: Duration::from_secs(self.heartbeat_secs.max(1)),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.server_config();

    info!(
        env = %config.environment,
        db = %args.db_path,
        cors = %config.cors_origin,
        trust_proxy = config.trust_proxy,
        rate_limit = config.rate_limit.enabled,
        "server config loaded"
    );

    let store = open_store(&args.db_path)?;
    let state = ServerState::new(store, config);
    state.limits.spawn_cleanup();

    let addr = state.config.bind_addr();
    let hub = Arc::clone(&state.hub);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running on http://{addr}");

    serve(listener, state, shutdown_signal(hub)).await?;

    info!("Server stopped");
    Ok(())
}

/// Serve the app on `listener` until `shutdown` resolves. Peer addresses are
/// exposed to handlers for rate limiting.
async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("server error")
}

fn open_store(db_path: &str) -> anyhow::Result<PollStore> {
    let config = StorageConfig::from_path(db_path);

    if !config.is_memory()
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    PollStore::open(&config).with_context(|| format!("failed to open database {db_path}"))
}

/// Resolves on Ctrl+C or SIGTERM, then ends every open stream so the
/// graceful shutdown does not wait on them forever.
async fn shutdown_signal(hub: Arc<LiveHub>) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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

    hub.close_all();
}
