//! Real-time Event System
//!
//! This module defines the typed event union delivered by the realtime
//! transport. Every inbound event the core routes — messages, thread-list
//! changes, notifications, typing signals, presence announcements — is one
//! of these variants. The transport is push-only and unordered across
//! channels; consumers that care about ordering guard for it themselves
//! (see the delivery tracker's monotonic transitions and the typing
//! liveness filter).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::message::{ChatMessage, DeliveryState, ThreadSummary};
use crate::shared::notification::Notification;
use crate::shared::presence::PresenceStatus;

/// A typing signal for a thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingSignal {
    /// Thread the signal applies to
    pub thread_id: Uuid,
    /// User who is (or stopped) typing
    pub user_id: Uuid,
    /// Whether the user started (true) or stopped (false) typing
    pub is_typing: bool,
}

/// A self-reported presence announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceUpdate {
    /// User announcing their status
    pub user_id: Uuid,
    /// The announced status
    pub status: PresenceStatus,
}

/// An update to an existing message
///
/// Delivery acknowledgements arrive as message updates with the `delivery`
/// field set; content edits carry `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageUpdate {
    /// Message being updated
    pub message_id: Uuid,
    /// Thread the message belongs to
    pub thread_id: Uuid,
    /// Delivery state transition, if this update is an acknowledgement
    #[serde(default)]
    pub delivery: Option<DeliveryState>,
    /// New content, if this update is an edit
    #[serde(default)]
    pub content: Option<String>,
}

/// Real-time event pushed by the hosted transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// A new message arrived in a thread
    NewMessage(ChatMessage),
    /// An existing message changed (edit or delivery acknowledgement)
    MessageUpdate(MessageUpdate),
    /// A new thread was created
    NewThread(ThreadSummary),
    /// A thread's summary changed
    ThreadUpdate(ThreadSummary),
    /// A new notification for the subscribed user
    NewNotification(Notification),
    /// An existing notification changed (e.g. marked read)
    NotificationUpdate(Notification),
    /// A typing signal in a thread
    Typing(TypingSignal),
    /// A presence announcement
    Presence(PresenceUpdate),
}

impl RealtimeEvent {
    /// Create a typing event
    pub fn typing(thread_id: Uuid, user_id: Uuid, is_typing: bool) -> Self {
        Self::Typing(TypingSignal {
            thread_id,
            user_id,
            is_typing,
        })
    }

    /// Create a presence event
    pub fn presence(user_id: Uuid, status: PresenceStatus) -> Self {
        Self::Presence(PresenceUpdate { user_id, status })
    }

    /// Create a delivery acknowledgement event
    pub fn delivery_ack(message_id: Uuid, thread_id: Uuid, state: DeliveryState) -> Self {
        Self::MessageUpdate(MessageUpdate {
            message_id,
            thread_id,
            delivery: Some(state),
            content: None,
        })
    }

    /// Wire name of this event's type, as used by SSE event names
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => "new-message",
            Self::MessageUpdate(_) => "message-update",
            Self::NewThread(_) => "new-thread",
            Self::ThreadUpdate(_) => "thread-update",
            Self::NewNotification(_) => "new-notification",
            Self::NotificationUpdate(_) => "notification-update",
            Self::Typing(_) => "typing",
            Self::Presence(_) => "presence",
        }
    }
}
