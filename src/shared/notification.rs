//! Notification Data Structures
//!
//! Represents a user-facing notification delivered through the realtime
//! dispatcher. Priority is a presentation contract: `Urgent` requests a
//! persistent desktop alert, everything else is transient. All priorities
//! are dispatched with equal and immediate urgency internally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presentation priority of a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    /// Requests a persistent (non-auto-dismissing) desktop alert
    Urgent,
}

impl Default for NotificationPriority {
    fn default() -> Self {
        NotificationPriority::Normal
    }
}

/// A user notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,
    /// User this notification is addressed to
    pub user_id: Uuid,
    /// Short title shown in lists and alerts
    pub title: String,
    /// Notification body text
    pub body: String,
    /// Presentation priority
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Whether the user has read this notification
    #[serde(default)]
    pub read: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new notification with a generated ID and current timestamp
    pub fn new(user_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_defaults() {
        let n = Notification::new(Uuid::new_v4(), "Repair ready", "Ticket #1042 completed");
        assert_eq!(n.priority, NotificationPriority::Normal);
        assert!(!n.read);
    }

    #[test]
    fn test_with_priority() {
        let n = Notification::new(Uuid::new_v4(), "Stock alert", "Low stock: 18k band")
            .with_priority(NotificationPriority::Urgent);
        assert_eq!(n.priority, NotificationPriority::Urgent);
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&NotificationPriority::Urgent).unwrap();
        assert_eq!(json, "\"urgent\"");
    }

    #[test]
    fn test_missing_priority_defaults_to_normal() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "title": "t",
            "body": "b",
            "created_at": Utc::now(),
        });
        let n: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(n.priority, NotificationPriority::Normal);
    }
}
