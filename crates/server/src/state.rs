//! Shared server state.
//!
//! Contains the store, the live hub, limits and metrics shared across
//! handlers.
//!
//! # Design Principles
//!
//! - **Declarative**: State is data, handlers extract what they need
//! - **Modular**: State independent of route logic
//! - **SoC**: Storage is blocking and runs off the async workers

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use storage::{PollStore, StoreError};

use crate::app::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::hub::LiveHub;
use crate::rate_limit::RateLimits;

/// Shared state for all route handlers.
///
/// Cloned into each handler via Axum's State extractor.
#[derive(Clone)]
pub struct ServerState {
    /// Poll persistence.
    pub store: Arc<PollStore>,

    /// Open live-update streams.
    pub hub: Arc<LiveHub>,

    /// Immutable runtime configuration.
    pub config: Arc<ServerConfig>,

    /// Per-IP request budgets.
    pub limits: RateLimits,

    /// Server start time.
    pub start_time: Instant,

    /// Shared metrics.
    pub metrics: Arc<ServerMetrics>,
}

impl ServerState {
    /// Create state around an opened store.
    pub fn new(store: PollStore, config: ServerConfig) -> Self {
        let limits = RateLimits::from_config(&config.rate_limit);
        Self {
            store: Arc::new(store),
            hub: Arc::new(LiveHub::new()),
            config: Arc::new(config),
            limits,
            start_time: Instant::now(),
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run a blocking store operation on the blocking pool.
    pub async fn with_store<T, F>(&self, op: F) -> AppResult<T>
    where
        F: FnOnce(&PollStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| AppError::Internal(format!("storage task failed: {e}")))?
            .map_err(AppError::from)
    }
}

/// Server-side counters.
pub struct ServerMetrics {
    pub polls_created: AtomicU64,
    pub votes_accepted: AtomicU64,
    pub votes_rejected: AtomicU64,
    /// Streams opened since start (currently open ones live in the hub).
    pub streams_opened: AtomicU64,
}

impl ServerMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            polls_created: AtomicU64::new(0),
            votes_accepted: AtomicU64::new(0),
            votes_rejected: AtomicU64::new(0),
            streams_opened: AtomicU64::new(0),
        }
    }

    pub fn poll_created(&self) {
        self.polls_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vote_accepted(&self) {
        self.votes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vote_rejected(&self) {
        self.votes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn polls(&self) -> u64 {
        self.polls_created.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.votes_accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.votes_rejected.load(Ordering::Relaxed)
    }

    pub fn streams(&self) -> u64 {
        self.streams_opened.load(Ordering::Relaxed)
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
