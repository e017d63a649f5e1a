//! Axum application builder.
//!
//! Configures routes, middleware, and state for the server.
//!
//! # Design Principles
//!
//! - **Declarative**: Routes declared via Axum's type-safe Router
//! - **Modular**: App builder separate from handlers
//! - **SoC**: Configuration here, logic in route modules
//!
//! # Routes
//!
//! - `GET /health`, `GET /health/ready` - Probes
//! - `POST /api/polls` - Create poll (rate limited)
//! - `GET /api/polls/{pollId}` - Poll with counts
//! - `POST /api/polls/{pollId}/vote` - Vote (rate limited)
//! - `GET /api/polls/{pollId}/stream` - Live results (SSE)

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{self, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::{ErrorBody, InternalDetails};
use crate::rate_limit::{self, RateLimitConfig};
use crate::routes::{health, polls, stream, votes};
use crate::state::ServerState;

/// Create the Axum application with all routes.
pub fn create_app(state: ServerState) -> Router {
    let config = Arc::clone(&state.config);

    let router = Router::new()
        // Health endpoints
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        // Polls
        .route(
            "/api/polls",
            post(polls::create_poll).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::limit_poll_creation,
            )),
        )
        .route("/api/polls/{poll_id}", get(polls::get_poll))
        // Votes + live results
        .route(
            "/api/polls/{poll_id}/vote",
            post(votes::submit_vote).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::limit_votes,
            )),
        )
        .route("/api/polls/{poll_id}/stream", get(stream::stream_poll));

    let router = if config.environment.is_development() {
        router.layer(middleware::map_response(expose_internal_details))
    } else {
        router
    };

    router
        // Middleware
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        // State
        .with_state(state)
}

/// CORS for the browser front end. `*` allows any origin without credentials.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if config.cors_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| warn!(origin = o, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Development only: copy the hidden 500 message into the body.
async fn expose_internal_details(mut response: Response) -> Response {
    match response.extensions_mut().remove::<InternalDetails>() {
        Some(InternalDetails(details)) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (
                status,
                Json(ErrorBody::new(status, "Internal server error", Some(details))),
            )
                .into_response()
        }
        None => response,
    }
}

/// Deployment mode. Development exposes internal error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{other}' (expected development or production)"
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
    /// Allowed browser origin(s), comma separated, or `*`.
    pub cors_origin: String,
    /// Public base URL for share links. Derived from the request when unset.
    pub public_url: Option<String>,
    pub environment: Environment,
    /// Honor `X-Forwarded-*` from one reverse proxy.
    pub trust_proxy: bool,
    pub rate_limit: RateLimitConfig,
    /// Interval between stream heartbeats.
    pub heartbeat: Duration,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".into(),
            cors_origin: "http://localhost:5173".into(),
            public_url: None,
            environment: Environment::Development,
            trust_proxy: false,
            rate_limit: RateLimitConfig::default(),
            heartbeat: Duration::from_secs(30),
            max_body_bytes: 16 * 1024,
        }
    }
}

impl ServerConfig {
    /// Get bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
