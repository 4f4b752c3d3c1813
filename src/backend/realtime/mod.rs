//! Realtime coordination core
//!
//! Everything that keeps collaborating sessions consistent in real time:
//! the transport seam, per-surface rate limiting, delivery tracking,
//! presence and typing, notification fan-out, and the subscription
//! lifecycle that ties them together.

pub mod delivery;
pub mod dispatcher;
pub mod presence;
pub mod rate_limit;
pub mod subscription;
pub mod transport;

pub use delivery::{DeliveryStatus, DeliveryTracker};
pub use dispatcher::{
    AlertPermission, AlertSink, DesktopAlert, ListenerId, NoopAlerts, NotificationCallback,
    NotificationDispatcher,
};
pub use presence::PresenceCoordinator;
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, SlidingWindowLimiter};
pub use subscription::{BackoffPolicy, ConnectionStatus, SubscriptionManager};
pub use transport::{Channel, EventStream, InMemoryTransport, RealtimeTransport, TransportError};
