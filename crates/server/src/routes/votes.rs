//! Vote endpoint.
//!
//! `POST /api/polls/{pollId}/vote` records one vote per fingerprint and, on
//! success, pushes the new aggregate to every open stream of the poll.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use storage::VoteOutcome;
use tracing::{debug, info};
use types::{NewVote, VoteRequest, VoteResponse, parse_poll_id};

use crate::client::ClientIp;
use crate::error::{AppError, AppResult};
use crate::state::ServerState;

/// Submit a vote: `POST /api/polls/{pollId}/vote`
pub async fn submit_vote(
    State(state): State<ServerState>,
    Path(poll_id): Path<String>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> AppResult<Json<VoteResponse>> {
    let poll_id = parse_poll_id(&poll_id).map_err(AppError::InvalidParams)?;
    let Json(req) = payload?;
    let vote = NewVote::try_from(req)?;
    let voter_ip = ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());

    let outcome = state
        .with_store(move |store| store.submit_vote(poll_id, &vote, &voter_ip))
        .await?;

    match outcome {
        VoteOutcome::Accepted(results) => {
            state.metrics.vote_accepted();
            let listeners = state.hub.broadcast(poll_id, &results);
            info!(poll = %poll_id, total = results.total_votes, listeners, "vote accepted");
            Ok(Json(VoteResponse::accepted(results)))
        }
        VoteOutcome::AlreadyVoted(results) => {
            state.metrics.vote_rejected();
            debug!(poll = %poll_id, "duplicate vote");
            Err(AppError::AlreadyVoted(results))
        }
        VoteOutcome::UnknownOption => {
            state.metrics.vote_rejected();
            Err(AppError::UnknownOption)
        }
    }
}
