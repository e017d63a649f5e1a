//! Storage layer for live-poll
//!
//! **Philosophy:** Declarative, Modular, SoC
//! - Declarative: Schema defined upfront, constraints carry the rules
//! - Modular: Store is a plain struct, callers decide threading
//! - SoC: This crate ONLY handles persistence, no HTTP or fan-out logic
//!
//! **Scope:**
//! - Polls with ordered options
//! - Votes, unique per (poll, voter fingerprint)
//! - Aggregated results read inside the vote transaction

mod schema;
mod store;

pub use schema::{StorageConfig, init_schema};
pub use store::{PollStore, StoreError, VoteOutcome};
