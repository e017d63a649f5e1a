//! Core types for live-poll.
//!
//! This crate provides the identifiers, wire formats and input validation
//! shared by the storage layer and the HTTP server.

pub mod ids;
pub mod poll;
pub mod validate;

pub use ids::{OptionId, PollId};
pub use poll::{
    CreatePollRequest, CreatePollResponse, Poll, PollOption, PollResults, StreamMessage,
    StreamMessageKind, VoteRequest, VoteResponse,
};
pub use validate::{Fingerprint, NewPoll, NewVote, ValidationError, parse_poll_id};
