//! Chat Message Data Structures
//!
//! Represents a message in a thread, the thread summary used by thread-list
//! events, and the per-message delivery state carried by acknowledgements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of a message
///
/// Transitions are monotonic: `sent -> delivered -> read`, with `failed`
/// reachable from `sent` only. `read` and `failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Handed to the transport, no acknowledgement yet
    Sent,
    /// Acknowledged by the recipient's device
    Delivered,
    /// Opened by the recipient
    Read,
    /// Delivery failed
    Failed,
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Thread this message belongs to
    pub thread_id: Uuid,
    /// User who sent the message
    pub sender_id: Uuid,
    /// Addressed recipient
    pub recipient_id: Uuid,
    /// Message content
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message with a generated ID and current timestamp
    pub fn new(thread_id: Uuid, sender_id: Uuid, recipient_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            sender_id,
            recipient_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Summary of a thread, carried by thread-list events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadSummary {
    /// Unique thread ID
    pub id: Uuid,
    /// Thread title (e.g. customer name or order reference)
    pub title: String,
    /// Participants in the thread
    pub participant_ids: Vec<Uuid>,
    /// When the most recent message arrived
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}
