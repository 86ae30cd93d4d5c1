//! Lifecycle events published by the manager.

use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the event channel. Slow subscribers lag and skip events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something that happened to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session was minted.
    Created { session_id: String },
    /// A valid session had its `createdAt` reset.
    Renewed { session_id: String },
    /// A stored session was past its expiry and was evicted.
    Expired { session_id: String },
    /// A stored session lacked its IP hash under pinning and was evicted.
    Corrupted { session_id: String },
    /// The request IP did not match the session's IP hash.
    ///
    /// The stored session is left untouched.
    IpMismatch { session_id: String },
    /// The session was written back.
    Persisted { session_id: String },
    /// Write-back was not needed.
    Skipped { session_id: String },
    /// The session was explicitly destroyed.
    Destroyed { session_id: String },
    /// A sweep pass finished.
    Swept { evicted: usize },
}

impl SessionEvent {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionEvent::Created { session_id }
            | SessionEvent::Renewed { session_id }
            | SessionEvent::Expired { session_id }
            | SessionEvent::Corrupted { session_id }
            | SessionEvent::IpMismatch { session_id }
            | SessionEvent::Persisted { session_id }
            | SessionEvent::Skipped { session_id }
            | SessionEvent::Destroyed { session_id } => Some(session_id),
            SessionEvent::Swept { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Created { .. } => "created",
            SessionEvent::Renewed { .. } => "renewed",
            SessionEvent::Expired { .. } => "expired",
            SessionEvent::Corrupted { .. } => "corrupted",
            SessionEvent::IpMismatch { .. } => "ip_mismatch",
            SessionEvent::Persisted { .. } => "persisted",
            SessionEvent::Skipped { .. } => "skipped",
            SessionEvent::Destroyed { .. } => "destroyed",
            SessionEvent::Swept { .. } => "swept",
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`. Having no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
