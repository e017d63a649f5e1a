//! Live result fan-out to open stream connections.
//!
//! # Architecture
//!
//! ```text
//! POST /vote ──▶ store.submit_vote() ──▶ hub.broadcast(poll, results)
//!                                              │
//!                    ┌─────────────────────────┼──────────────────────┐
//!                    ▼                         ▼                      ▼
//!              Subscription #1           Subscription #2        Subscription #n
//!              (GET /stream)             (GET /stream)          (GET /stream)
//! ```
//!
//! Connections are grouped per poll. Each one owns an unbounded channel, so a
//! slow reader never blocks a vote. Dropping a [`Subscription`] removes its
//! channel, and a poll entry goes away with its last connection.
//!
//! Delivery is best effort: no replay, no acknowledgment. A client that
//! reconnects gets a fresh snapshot.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use types::{PollId, PollResults};

/// Per-process identifier of one stream connection.
pub type ConnectionId = u64;

#[derive(Default)]
struct PollChannels {
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<PollResults>>,
    /// Highest vote total pushed so far. Totals only grow.
    latest_total: u64,
}

/// Registry of open live-update channels, keyed by poll.
#[derive(Default)]
pub struct LiveHub {
    connections: Mutex<HashMap<PollId, PollChannels>>,
    next_id: AtomicU64,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel for `poll`. The channel closes when the returned
    /// subscription is dropped.
    pub fn register(self: &Arc<Self>, poll: PollId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections
            .lock()
            .entry(poll)
            .or_default()
            .senders
            .insert(id, tx);
        debug!(poll = %poll, connection = id, "stream registered");

        Subscription {
            poll,
            id,
            rx,
            hub: Arc::clone(self),
        }
    }

    /// Remove one channel. No-op if it is already gone.
    pub fn unregister(&self, poll: PollId, id: ConnectionId) {
        let mut connections = self.connections.lock();
        let Some(channels) = connections.get_mut(&poll) else {
            return;
        };

        if channels.senders.remove(&id).is_some() {
            debug!(poll = %poll, connection = id, "stream unregistered");
        }
        if channels.senders.is_empty() {
            connections.remove(&poll);
        }
    }

    /// Push `results` to every open channel of `poll`.
    ///
    /// Channels whose receiver is gone are pruned. An aggregate with a lower
    /// total than one already pushed is stale and dropped. Returns the number
    /// of channels the update was queued on.
    pub fn broadcast(&self, poll: PollId, results: &PollResults) -> usize {
        let mut connections = self.connections.lock();
        let Some(channels) = connections.get_mut(&poll) else {
            return 0;
        };

        if results.total_votes < channels.latest_total {
            debug!(
                poll = %poll,
                total = results.total_votes,
                latest = channels.latest_total,
                "stale update skipped"
            );
            return 0;
        }
        channels.latest_total = results.total_votes;

        channels
            .senders
            .retain(|_, tx| tx.send(results.clone()).is_ok());
        let delivered = channels.senders.len();

        if channels.senders.is_empty() {
            connections.remove(&poll);
        }
        delivered
    }

    /// Open channels for one poll.
    pub fn connection_count(&self, poll: PollId) -> usize {
        self.connections
            .lock()
            .get(&poll)
            .map_or(0, |channels| channels.senders.len())
    }

    /// Open channels across all polls.
    pub fn total_connections(&self) -> usize {
        self.connections
            .lock()
            .values()
            .map(|channels| channels.senders.len())
            .sum()
    }

    /// Drop every channel so open streams end. Used on shutdown.
    pub fn close_all(&self) {
        let closed = std::mem::take(&mut *self.connections.lock());
        debug!(polls = closed.len(), "closing all streams");
    }
}

/// Receiving end of one live-update channel.
///
/// Yields each broadcast aggregate in send order. Unregisters on drop.
pub struct Subscription {
    poll: PollId,
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<PollResults>,
    hub: Arc<LiveHub>,
}

impl Subscription {
    pub fn poll_id(&self) -> PollId {
        self.poll
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = PollResults;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.poll, self.id);
    }
}
