//! Server-Sent Events stream of live results.
//!
//! # Endpoints
//!
//! - `GET /api/polls/{pollId}/stream`
//!
//! # Protocol
//!
//! Every event is `data: {"type":"update","data":<PollResults>}`. The first
//! one is the current snapshot; one more follows each accepted vote. A
//! `: heartbeat` comment keeps idle proxies from closing the connection.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::http::header::HeaderName;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{StreamExt, future, stream};
use tracing::{debug, warn};
use types::{PollResults, StreamMessage, parse_poll_id};

use crate::error::{AppError, AppResult};
use crate::state::ServerState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Open a live stream: `GET /api/polls/{pollId}/stream`
pub async fn stream_poll(
    State(state): State<ServerState>,
    Path(poll_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let poll_id = parse_poll_id(&poll_id).map_err(AppError::InvalidParams)?;

    // Register before reading the snapshot so no accepted vote falls between
    let subscription = state.hub.register(poll_id);
    let snapshot = state
        .with_store(move |store| store.get_results(poll_id))
        .await?
        .ok_or(AppError::PollNotFound)?;

    state.metrics.stream_opened();
    debug!(
        poll = %poll_id,
        connection = subscription.id(),
        listeners = state.hub.connection_count(poll_id),
        "stream opened"
    );

    let events = stream::once(future::ready(snapshot))
        .chain(subscription)
        .map(to_event);

    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.heartbeat)
            .text("heartbeat"),
    );

    Ok((
        [(X_ACCEL_BUFFERING, HeaderValue::from_static("no"))],
        sse,
    ))
}

fn to_event(results: PollResults) -> Result<Event, Infallible> {
    let event = Event::default()
        .json_data(StreamMessage::update(results))
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to serialize stream message");
            Event::default().comment("serialization error")
        });
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_message_is_tagged() {
        let msg = StreamMessage::update(PollResults::new("Best editor for Rust?", vec![]));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with("{\"type\":\"update\""));
    }

    #[test]
    fn test_to_event_never_fails() {
        assert!(to_event(PollResults::new("Best editor for Rust?", vec![])).is_ok());
    }
}
