//! Event types for the gtier event system
//!
//! Provides shared event definitions and the EventBus used by the ranking
//! service to announce session lifecycle changes.

mod ranking_types;

pub use ranking_types::RankingPhase;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ranking event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to whatever front end is listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RankingEvent {
    /// A session was created (or an old one overwritten by restart)
    SessionStarted {
        owner: String,
        session_id: Uuid,
        item_count: usize,
        phase: RankingPhase,
        comparisons_expected: u64,
        timestamp: DateTime<Utc>,
    },

    /// The oracle answered a comparison
    ComparisonRecorded {
        owner: String,
        session_id: Uuid,
        winner: i64,
        loser: i64,
        comparisons_done: u64,
        comparisons_expected: u64,
        timestamp: DateTime<Utc>,
    },

    /// Session moved to another phase
    PhaseChanged {
        owner: String,
        session_id: Uuid,
        old_phase: RankingPhase,
        new_phase: RankingPhase,
        timestamp: DateTime<Utc>,
    },

    /// Total order is available
    SessionFinished {
        owner: String,
        session_id: Uuid,
        ranked_count: usize,
        eliminated_count: usize,
        comparisons_done: u64,
        timestamp: DateTime<Utc>,
    },

    /// Session removed by owner deletion
    SessionDeleted {
        owner: String,
        timestamp: DateTime<Utc>,
    },
}

impl RankingEvent {
    /// Owner the event belongs to
    pub fn owner(&self) -> &str {
        match self {
            RankingEvent::SessionStarted { owner, .. }
            | RankingEvent::ComparisonRecorded { owner, .. }
            | RankingEvent::PhaseChanged { owner, .. }
            | RankingEvent::SessionFinished { owner, .. }
            | RankingEvent::SessionDeleted { owner, .. } => owner,
        }
    }
}

/// Broadcast bus for [`RankingEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RankingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use gtier_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RankingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RankingEvent,
    ) -> Result<usize, broadcast::error::SendError<RankingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RankingEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
