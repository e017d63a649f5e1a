//! Poll store implementation
//!
//! **Philosophy:** Declarative, Modular, SoC
//! - Schema owns the invariants (one vote per poll and fingerprint)
//! - Store translates constraint failures into typed outcomes
//! - No HTTP or broadcast concerns here (SoC)

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;
use types::{NewPoll, NewVote, OptionId, Poll, PollId, PollOption, PollResults};
use uuid::Uuid;

use crate::schema::{StorageConfig, init_schema};

/// Storage failures that are not part of normal vote flow.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Option lookup succeeded but the poll row was gone.
    #[error("poll {0} vanished during vote")]
    PollMissing(PollId),
}

/// Result of a vote attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; results include it.
    Accepted(PollResults),
    /// This fingerprint already voted on the poll. Current results attached.
    AlreadyVoted(PollResults),
    /// Option does not belong to the poll, or the poll does not exist.
    UnknownOption,
}

/// SQLite-backed store for polls, options and votes.
///
/// Single connection behind a Mutex. Every write runs in its own transaction.
pub struct PollStore {
    conn: Mutex<Connection>,
}

impl PollStore {
    /// Open (or create) the database described by `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.path)?
        };

        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(&StorageConfig::default())
    }

    /// Insert a poll and its options atomically.
    pub fn create_poll(
        &self,
        poll: &NewPoll,
        creator_ip: Option<&str>,
    ) -> Result<PollId, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let id = PollId::new();

        tx.execute(
            "INSERT INTO polls (id, question, creator_ip, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.0, poll.question(), creator_ip, Utc::now()],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO options (id, poll_id, text, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, text) in poll.options().iter().enumerate() {
                stmt.execute(params![OptionId::new().0, id.0, text, position as i64])?;
            }
        }

        tx.commit()?;
        debug!(poll = %id, options = poll.options().len(), "poll created");
        Ok(id)
    }

    /// Poll with per-option counts, or `None` if unknown.
    pub fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let conn = self.conn.lock();

        let header = conn
            .query_row(
                "SELECT question, created_at FROM polls WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
            )
            .optional()?;

        let Some((question, created_at)) = header else {
            return Ok(None);
        };

        Ok(Some(Poll {
            id,
            question,
            created_at,
            options: load_options(&conn, id)?,
        }))
    }

    /// Current aggregate for a poll, or `None` if unknown.
    pub fn get_results(&self, id: PollId) -> Result<Option<PollResults>, StoreError> {
        let conn = self.conn.lock();
        Ok(load_results(&conn, id)?)
    }

    /// Record a vote.
    ///
    /// Option membership check, insert, and result read share one
    /// transaction, so `Accepted` results always include this vote.
    pub fn submit_vote(
        &self,
        poll: PollId,
        vote: &NewVote,
        voter_ip: &str,
    ) -> Result<VoteOutcome, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let belongs = tx
            .query_row(
                "SELECT 1 FROM options WHERE id = ?1 AND poll_id = ?2",
                params![vote.option_id.0, poll.0],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !belongs {
            debug!(poll = %poll, option = %vote.option_id, "vote for foreign option");
            return Ok(VoteOutcome::UnknownOption);
        }

        let inserted = tx.execute(
            "INSERT INTO votes (id, poll_id, option_id, voter_fingerprint, voter_ip, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4(),
                poll.0,
                vote.option_id.0,
                vote.fingerprint.as_str(),
                voter_ip,
                Utc::now(),
            ],
        );

        match inserted {
            Ok(_) => {
                let results = load_results(&tx, poll)?.ok_or(StoreError::PollMissing(poll))?;
                tx.commit()?;
                debug!(poll = %poll, total = results.total_votes, "vote recorded");
                Ok(VoteOutcome::Accepted(results))
            }
            Err(e) if is_unique_violation(&e) => {
                // Failed statement is already undone; tx rolls back on drop
                let results = load_results(&tx, poll)?.ok_or(StoreError::PollMissing(poll))?;
                debug!(poll = %poll, "duplicate vote rejected");
                Ok(VoteOutcome::AlreadyVoted(results))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored polls.
    pub fn poll_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM polls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn load_options(conn: &Connection, poll: PollId) -> rusqlite::Result<Vec<PollOption>> {
    let mut stmt = conn.prepare_cached(
        "SELECT o.id, o.text, COUNT(v.id)
         FROM options o
         LEFT JOIN votes v ON v.option_id = o.id
         WHERE o.poll_id = ?1
         GROUP BY o.id
         ORDER BY o.position",
    )?;

    let rows = stmt.query_map(params![poll.0], |row| {
        Ok(PollOption {
            id: OptionId(row.get(0)?),
            text: row.get(1)?,
            votes: row.get::<_, i64>(2)? as u64,
        })
    })?;

    rows.collect()
}

fn load_results(conn: &Connection, poll: PollId) -> rusqlite::Result<Option<PollResults>> {
    let question = conn
        .query_row(
            "SELECT question FROM polls WHERE id = ?1",
            params![poll.0],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match question {
        Some(question) => Ok(Some(PollResults::new(question, load_options(conn, poll)?))),
        None => Ok(None),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
