//! Server crate: Axum-based HTTP + Server-Sent Events service for live polls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  POST /vote   ┌─────────────┐  submit_vote  ┌──────────────┐
//! │   Voter      │ ────────────▶ │   Router    │ ────────────▶ │  PollStore   │
//! └──────────────┘               │  (handlers) │ ◀──────────── │  (SQLite)    │
//!                                └──────┬──────┘   outcome     └──────────────┘
//!                                       │ broadcast(results)
//!                                       ▼
//! ┌──────────────┐  SSE events   ┌─────────────┐
//! │   Viewers    │ ◀──────────── │   LiveHub   │
//! └──────────────┘               └─────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Declarative**: Routes and handlers declared via Axum's type-safe routing
//! - **Modular**: Each feature (health, polls, votes, stream) in separate module
//! - **SoC**: Store owns vote rules; hub only fans out
//!
//! # Modules
//!
//! - [`app`]: Axum application builder, router setup, configuration
//! - [`state`]: Shared server state (store, hub, limits, metrics)
//! - [`error`]: Unified error handling with HTTP status codes
//! - [`routes`]: HTTP route handlers
//! - [`hub`]: Per-poll registry of open live-update channels
//! - [`rate_limit`]: Per-IP sliding-window limits
//! - [`client`]: Client address and origin resolution

pub mod app;
pub mod client;
pub mod error;
pub mod hub;
pub mod rate_limit;
pub mod routes;
pub mod state;

// Re-exports for convenience
pub use app::{Environment, ServerConfig, create_app};
pub use error::{AppError, AppResult};
pub use hub::{LiveHub, Subscription};
pub use rate_limit::RateLimitConfig;
pub use state::{ServerMetrics, ServerState};
