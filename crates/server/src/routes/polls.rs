//! Poll endpoints.
//!
//! - `POST /api/polls` - Create a poll, returns id and share link
//! - `GET /api/polls/{pollId}` - Poll with current counts

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::info;
use types::{CreatePollRequest, CreatePollResponse, NewPoll, Poll, parse_poll_id};

use crate::client::{ClientIp, request_origin};
use crate::error::{AppError, AppResult};
use crate::state::ServerState;

/// Create a poll: `POST /api/polls`
pub async fn create_poll(
    State(state): State<ServerState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreatePollResponse>)> {
    let Json(req) = payload?;
    let poll = NewPoll::try_from(req)?;
    let creator_ip = ip.map(|ip| ip.to_string());

    let poll_id = state
        .with_store(move |store| store.create_poll(&poll, creator_ip.as_deref()))
        .await?;
    state.metrics.poll_created();

    let share_url = format!("{}/poll/{}", request_origin(&headers, &state.config), poll_id);
    info!(poll = %poll_id, "poll created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePollResponse { poll_id, share_url }),
    ))
}

/// Fetch a poll: `GET /api/polls/{pollId}`
pub async fn get_poll(
    State(state): State<ServerState>,
    Path(poll_id): Path<String>,
) -> AppResult<Json<Poll>> {
    let poll_id = parse_poll_id(&poll_id).map_err(AppError::InvalidParams)?;

    state
        .with_store(move |store| store.get_poll(poll_id))
        .await?
        .map(Json)
        .ok_or(AppError::PollNotFound)
}
