//! Per-IP sliding-window rate limits for poll creation and voting.
//!
//! Each limiter keeps the request instants seen inside its window per client
//! address. Requests whose client address is unknown pass through.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tracing::warn;
use types::parse_poll_id;

use crate::client::ClientIp;
use crate::error::AppError;
use crate::state::ServerState;

/// Limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub votes_per_window: usize,
    pub vote_window: Duration,
    pub polls_per_window: usize,
    pub poll_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            votes_per_window: 3,
            vote_window: Duration::from_secs(60 * 60),
            polls_per_window: 10,
            poll_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    clients: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `ip`. `Err` carries the seconds until a slot frees.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut clients = self.clients.lock();
        let timestamps = clients.entry(ip).or_default();
        timestamps.retain(|t| now.saturating_duration_since(*t) < self.window);
        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after.as_secs().max(1));
        }
        timestamps.push(now);
        Ok(())
    }

    /// Forget clients with no requests left in the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut clients = self.clients.lock();
        clients.retain(|_, timestamps| {
            timestamps.retain(|t| now.saturating_duration_since(*t) < self.window);
            !timestamps.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

/// The limiters shared by all handlers. `None` means unlimited.
#[derive(Clone, Default)]
pub struct RateLimits {
    pub votes: Option<Arc<RateLimiter>>,
    pub poll_creation: Option<Arc<RateLimiter>>,
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self::default();
        }
        Self {
            votes: Some(Arc::new(RateLimiter::new(
                config.votes_per_window,
                config.vote_window,
            ))),
            poll_creation: Some(Arc::new(RateLimiter::new(
                config.polls_per_window,
                config.poll_window,
            ))),
        }
    }

    /// Prune stale entries once a minute for the life of the runtime.
    pub fn spawn_cleanup(&self) {
        let limiters: Vec<Arc<RateLimiter>> = [&self.votes, &self.poll_creation]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if limiters.is_empty() {
            return;
        }

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                for limiter in &limiters {
                    limiter.cleanup();
                }
            }
        });
    }
}

fn enforce(limiter: Option<&RateLimiter>, ip: Option<IpAddr>, what: &str) -> Result<(), AppError> {
    let (Some(limiter), Some(ip)) = (limiter, ip) else {
        return Ok(());
    };
    limiter.check(ip).map_err(|retry_after_secs| {
        warn!(%ip, retry_after_secs, "{what} rate limit exceeded");
        AppError::RateLimited { retry_after_secs }
    })
}

/// Middleware for `POST /api/polls/{pollId}/vote`.
///
/// A malformed poll id is rejected here and does not count against the
/// client's budget.
pub async fn limit_votes(
    State(state): State<ServerState>,
    ClientIp(ip): ClientIp,
    Path(poll_id): Path<String>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = parse_poll_id(&poll_id) {
        return AppError::InvalidParams(err).into_response();
    }

    match enforce(state.limits.votes.as_deref(), ip, "vote") {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Middleware for `POST /api/polls`.
pub async fn limit_poll_creation(
    State(state): State<ServerState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    match enforce(state.limits.poll_creation.as_deref(), ip, "poll creation") {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
