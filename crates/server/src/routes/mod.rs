//! Route handlers for the server.
//!
//! # Modules
//!
//! - [`health`]: Health and readiness endpoints
//! - [`polls`]: Poll creation and lookup
//! - [`votes`]: Vote submission and fan-out
//! - [`stream`]: Server-Sent Events live results

pub mod health;
pub mod polls;
pub mod stream;
pub mod votes;
