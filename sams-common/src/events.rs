//! Event types and the EventBus
//!
//! Timetable workflow notifications. Events are broadcast via [`EventBus`] and
//! serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// SAMS event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SamsEvent {
    /// The schedule generator returned candidates (not yet published)
    TimetableGenerated {
        course_id: String,
        semester: u32,
        options: Vec<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A new proposal set is open for voting
    ///
    /// Any earlier votes and final timetable for the course are gone.
    TimetableProposed {
        course_id: String,
        options: Vec<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A vote was recorded (voter identity is not broadcast)
    VoteCast {
        course_id: String,
        option: u32,
        total_votes: u32,
        timestamp: DateTime<Utc>,
    },

    /// Voting closed and a winner was committed
    TimetableFinalized {
        course_id: String,
        option: u32,
        votes: u32,
        timestamp: DateTime<Utc>,
    },
}

impl SamsEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SamsEvent::TimetableGenerated { .. } => "TimetableGenerated",
            SamsEvent::TimetableProposed { .. } => "TimetableProposed",
            SamsEvent::VoteCast { .. } => "VoteCast",
            SamsEvent::TimetableFinalized { .. } => "TimetableFinalized",
        }
    }

    pub fn course_id(&self) -> &str {
        match self {
            SamsEvent::TimetableGenerated { course_id, .. }
            | SamsEvent::TimetableProposed { course_id, .. }
            | SamsEvent::VoteCast { course_id, .. }
            | SamsEvent::TimetableFinalized { course_id, .. } => course_id,
        }
    }
}

/// Central event distribution bus
///
/// Uses `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// see `Lagged` instead of holding up producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SamsEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SamsEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; `Err` if no subscriber is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: SamsEvent) -> Result<usize, broadcast::error::SendError<SamsEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: SamsEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
