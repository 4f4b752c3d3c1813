//! Presence Data Structures
//!
//! Presence is self-reported: every participant announces its own status and
//! consumes everyone else's announcements. There is no server-computed
//! online list, so these types travel over the realtime transport as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Online status of a participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    Busy,
    Offline,
}

/// Last-known presence of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceRecord {
    /// Current status
    pub status: PresenceStatus,
    /// Timestamp of the last status change
    pub last_seen: DateTime<Utc>,
}

impl PresenceRecord {
    /// Create a record for a status change happening now
    pub fn now(status: PresenceStatus) -> Self {
        Self {
            status,
            last_seen: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PresenceStatus::Away).unwrap(),
            "\"away\""
        );
        let status: PresenceStatus = serde_json::from_str("\"busy\"").unwrap();
        assert_eq!(status, PresenceStatus::Busy);
    }

    #[test]
    fn test_record_now() {
        let record = PresenceRecord::now(PresenceStatus::Online);
        assert_eq!(record.status, PresenceStatus::Online);
    }
}
