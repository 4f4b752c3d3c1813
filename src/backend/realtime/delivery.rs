//! Delivery Status Tracker
//!
//! Per-message delivery state machine: `sent -> delivered -> read`, with
//! `failed` reachable from `sent` only. Acknowledgements arrive from an
//! unordered transport, so every transition is idempotent and monotonic —
//! re-applied or out-of-order acknowledgements are dropped silently.
//!
//! Statuses are never deleted; they live for the life of the message record.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::DeliveryState;

/// Delivery status of one message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryStatus {
    /// Current state
    pub state: DeliveryState,
    /// The addressed recipient
    pub recipient_id: Uuid,
    /// When the message was handed to the transport
    pub sent_at: DateTime<Utc>,
    /// When the delivered acknowledgement arrived, set at most once
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the read acknowledgement arrived, set at most once
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

/// Tracks delivery status for all messages of a session
pub struct DeliveryTracker {
    statuses: Mutex<HashMap<Uuid, DeliveryStatus>>,
}

impl DeliveryTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Record that a message was handed to the transport
    ///
    /// Idempotent: a second call for the same message does not move
    /// `sent_at` or reset later transitions.
    pub fn record_sent(&self, message_id: Uuid, recipient_id: Uuid) {
        let mut statuses = self.statuses.lock().expect("delivery map poisoned");
        statuses.entry(message_id).or_insert_with(|| DeliveryStatus {
            state: DeliveryState::Sent,
            recipient_id,
            sent_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        });
    }

    /// Record a delivered acknowledgement
    pub fn record_delivered(&self, message_id: Uuid) {
        self.transition(message_id, DeliveryState::Delivered);
    }

    /// Record a read acknowledgement
    pub fn record_read(&self, message_id: Uuid) {
        self.transition(message_id, DeliveryState::Read);
    }

    /// Record a delivery failure
    pub fn record_failed(&self, message_id: Uuid) {
        self.transition(message_id, DeliveryState::Failed);
    }

    /// Apply an acknowledgement state to a tracked message
    pub fn apply_ack(&self, message_id: Uuid, state: DeliveryState) {
        match state {
            // A sent "ack" carries no recipient; only the send path creates records
            DeliveryState::Sent => {}
            DeliveryState::Delivered => self.record_delivered(message_id),
            DeliveryState::Read => self.record_read(message_id),
            DeliveryState::Failed => self.record_failed(message_id),
        }
    }

    /// Current status of a message, if tracked
    pub fn status(&self, message_id: Uuid) -> Option<DeliveryStatus> {
        self.statuses
            .lock()
            .expect("delivery map poisoned")
            .get(&message_id)
            .cloned()
    }

    /// Aggregate status over a set of messages
    ///
    /// A total priority, not a vote: `read` only if all are read; `failed`
    /// if any is failed; otherwise `delivered` if all are at least
    /// delivered; otherwise `sent`. Failure always dominates the display
    /// because it is the actionable signal. Returns `None` when none of the
    /// messages are tracked.
    pub fn aggregate(&self, message_ids: &[Uuid]) -> Option<DeliveryState> {
        let statuses = self.statuses.lock().expect("delivery map poisoned");
        let states: Vec<DeliveryState> = message_ids
            .iter()
            .filter_map(|id| statuses.get(id).map(|s| s.state))
            .collect();
        if states.is_empty() {
            return None;
        }
        if states.iter().any(|&s| s == DeliveryState::Failed) {
            return Some(DeliveryState::Failed);
        }
        if states.iter().all(|&s| s == DeliveryState::Read) {
            return Some(DeliveryState::Read);
        }
        if states
            .iter()
            .all(|&s| s == DeliveryState::Delivered || s == DeliveryState::Read)
        {
            return Some(DeliveryState::Delivered);
        }
        Some(DeliveryState::Sent)
    }

    /// Number of tracked messages
    pub fn tracked_messages(&self) -> usize {
        self.statuses.lock().expect("delivery map poisoned").len()
    }

    fn transition(&self, message_id: Uuid, target: DeliveryState) {
        let mut statuses = self.statuses.lock().expect("delivery map poisoned");
        let Some(status) = statuses.get_mut(&message_id) else {
            tracing::debug!(
                "[Delivery] Acknowledgement for untracked message {}, ignoring",
                message_id
            );
            return;
        };

        let now = Utc::now();
        match (status.state, target) {
            (DeliveryState::Sent, DeliveryState::Delivered) => {
                status.state = DeliveryState::Delivered;
                status.delivered_at = Some(now);
            }
            (DeliveryState::Sent, DeliveryState::Read)
            | (DeliveryState::Delivered, DeliveryState::Read) => {
                // A read implies delivery even when the delivered ack was lost
                if status.delivered_at.is_none() {
                    status.delivered_at = Some(now);
                }
                status.state = DeliveryState::Read;
                status.read_at = Some(now);
            }
            (DeliveryState::Sent, DeliveryState::Failed) => {
                status.state = DeliveryState::Failed;
            }
            // Repeats and backward transitions are dropped silently
            (current, requested) => {
                tracing::debug!(
                    "[Delivery] Ignoring {:?} acknowledgement for message {} in state {:?}",
                    requested,
                    message_id,
                    current
                );
            }
        }
    }
}

impl Default for DeliveryTracker {
    fn default() -> Self {
        Self::new()
    }
}
