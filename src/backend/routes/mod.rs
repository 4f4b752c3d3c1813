//! Routes Module
//!
//! The thin HTTP surface collaborators use to drive the coordination core:
//! typing and presence publication, message sends, delivery receipts, and
//! the SSE realtime subscription.

/// Request handlers
pub mod handlers;

/// Router configuration
pub mod router;

pub use router::create_router;
