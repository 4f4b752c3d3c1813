//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the realtime core and its collaborators (page views, request handlers,
//! report builders). All types are designed for serialization and
//! transmission over HTTP and the realtime transport.

/// Message and thread data structures
pub mod message;

/// Real-time event system
pub mod event;

/// Notification types
pub mod notification;

/// Presence types
pub mod presence;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use event::{MessageUpdate, PresenceUpdate, RealtimeEvent, TypingSignal};
pub use message::{ChatMessage, DeliveryState, ThreadSummary};
pub use notification::{Notification, NotificationPriority};
pub use presence::{PresenceRecord, PresenceStatus};
