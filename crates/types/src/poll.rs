//! Poll data as it crosses the wire.
//!
//! All structs serialize in camelCase to match what browser clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OptionId, PollId};

/// One answer choice with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub text: String,
    pub votes: u64,
}

/// Full poll view: `GET /api/polls/{pollId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub created_at: DateTime<Utc>,
    /// Ordered by creation position.
    pub options: Vec<PollOption>,
}

/// Aggregate pushed to live viewers after every accepted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub question: String,
    pub total_votes: u64,
    pub options: Vec<PollOption>,
}

impl PollResults {
    /// Build results from ordered options, summing the total.
    pub fn new(question: impl Into<String>, options: Vec<PollOption>) -> Self {
        let total_votes = options.iter().map(|o| o.votes).sum();
        Self {
            question: question.into(),
            total_votes,
            options,
        }
    }

    /// Vote count for a single option, if present.
    pub fn votes_for(&self, option: OptionId) -> Option<u64> {
        self.options.iter().find(|o| o.id == option).map(|o| o.votes)
    }
}

impl From<Poll> for PollResults {
    fn from(poll: Poll) -> Self {
        PollResults::new(poll.question, poll.options)
    }
}

// =============================================================================
// Requests / Responses
// =============================================================================

/// Body of `POST /api/polls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
}

/// Response of `POST /api/polls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub poll_id: PollId,
    pub share_url: String,
}

/// Body of `POST /api/polls/{pollId}/vote`.
///
/// The option id is kept as a string so a malformed id is reported as a
/// validation failure instead of a body decoding error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: String,
    pub fingerprint: String,
}

/// Response of `POST /api/polls/{pollId}/vote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub results: Option<PollResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VoteResponse {
    pub fn accepted(results: PollResults) -> Self {
        Self {
            success: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>, results: Option<PollResults>) -> Self {
        Self {
            success: false,
            results,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Live stream
// =============================================================================

/// Kind of a live stream message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMessageKind {
    Update,
    Error,
}

/// Payload of one Server-Sent Event on `/api/polls/{pollId}/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: StreamMessageKind,
    pub data: PollResults,
}

impl StreamMessage {
    pub fn update(data: PollResults) -> Self {
        Self {
            kind: StreamMessageKind::Update,
            data,
        }
    }
}
