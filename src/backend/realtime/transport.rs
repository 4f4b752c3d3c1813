//! Realtime Transport
//!
//! The pub/sub seam between the coordination core and the hosted realtime
//! platform. The core only ever talks to the [`RealtimeTransport`] trait;
//! the in-memory implementation below backs tests and single-process
//! deployments with one `tokio::sync::broadcast` channel per logical
//! channel name.
//!
//! # Channels
//!
//! One logical channel exists per concern:
//!
//! - `threads:<user>` - the user's thread list
//! - `notifications:<user>` - the user's notifications
//! - `presence:<user>` - presence announcements visible to the user
//! - `thread:<id>` - a specific thread's message stream
//! - `thread-typing:<id>` - a specific thread's typing signals
//!
//! Events are delivered in transport order within one channel; no ordering
//! is guaranteed across channels.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::shared::RealtimeEvent;

/// A typed channel name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Per-user thread list updates
    Threads(Uuid),
    /// Per-user notifications
    Notifications(Uuid),
    /// Presence announcements visible to a user
    Presence(Uuid),
    /// A specific thread's message stream
    Thread(Uuid),
    /// A specific thread's typing signals
    ThreadTyping(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threads(user) => write!(f, "threads:{}", user),
            Self::Notifications(user) => write!(f, "notifications:{}", user),
            Self::Presence(user) => write!(f, "presence:{}", user),
            Self::Thread(id) => write!(f, "thread:{}", id),
            Self::ThreadTyping(id) => write!(f, "thread-typing:{}", id),
        }
    }
}

impl FromStr for Channel {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| TransportError::invalid_channel(s))?;
        let id = Uuid::parse_str(id).map_err(|_| TransportError::invalid_channel(s))?;
        match kind {
            "threads" => Ok(Self::Threads(id)),
            "notifications" => Ok(Self::Notifications(id)),
            "presence" => Ok(Self::Presence(id)),
            "thread" => Ok(Self::Thread(id)),
            "thread-typing" => Ok(Self::ThreadTyping(id)),
            _ => Err(TransportError::invalid_channel(s)),
        }
    }
}

/// Transport-level errors
///
/// These never reach collaborators as hard failures: subscription errors
/// degrade to a reconnecting status in the subscription manager, and
/// publishes to channels with no subscribers are not errors at all.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel name could not be parsed
    #[error("Invalid channel name: {name}")]
    InvalidChannel {
        /// The offending name
        name: String,
    },

    /// Subscribing to a channel failed
    #[error("Subscribe failed on '{channel}': {message}")]
    SubscribeFailed {
        /// Channel that failed
        channel: String,
        /// Human-readable error message
        message: String,
    },

    /// Publishing to a channel failed
    #[error("Publish failed on '{channel}': {message}")]
    PublishFailed {
        /// Channel that failed
        channel: String,
        /// Human-readable error message
        message: String,
    },
}

impl TransportError {
    /// Create an invalid-channel error
    pub fn invalid_channel(name: impl Into<String>) -> Self {
        Self::InvalidChannel { name: name.into() }
    }

    /// Create a subscribe error
    pub fn subscribe(channel: Channel, message: impl Into<String>) -> Self {
        Self::SubscribeFailed {
            channel: channel.to_string(),
            message: message.into(),
        }
    }
}

/// Stream of events delivered on one channel subscription
pub type EventStream = Pin<Box<dyn Stream<Item = RealtimeEvent> + Send>>;

/// The pub/sub transport the coordination core is built on
///
/// Object-safe so the subscription manager, coordinator, and handlers can
/// share one `Arc<dyn RealtimeTransport>`. Subscribing and publishing are
/// the only suspension points in the core.
pub trait RealtimeTransport: Send + Sync {
    /// Open a subscription to a channel
    ///
    /// The returned stream ends when the transport-side connection is lost;
    /// the subscription manager reacts by reconnecting with backoff.
    fn subscribe(&self, channel: Channel) -> BoxFuture<'_, Result<EventStream, TransportError>>;

    /// Publish an event to a channel
    ///
    /// Returns the number of subscribers that received the event. Zero
    /// subscribers is not an error.
    fn publish(
        &self,
        channel: Channel,
        event: RealtimeEvent,
    ) -> BoxFuture<'_, Result<usize, TransportError>>;
}

/// In-memory transport backed by per-channel broadcast senders
///
/// Channels are created lazily on first use. Lagged receivers skip missed
/// events rather than erroring, matching the at-least-once-while-connected
/// contract of the hosted platform.
pub struct InMemoryTransport {
    channels: Mutex<HashMap<Channel, broadcast::Sender<RealtimeEvent>>>,
    capacity: usize,
}

impl InMemoryTransport {
    /// Create a transport whose channels buffer `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Get or create the broadcast sender for a channel
    fn sender(&self, channel: Channel) -> broadcast::Sender<RealtimeEvent> {
        let mut channels = self.channels.lock().expect("transport channel map poisoned");
        channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of active subscribers on a channel
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.channels
            .lock()
            .expect("transport channel map poisoned")
            .get(&channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop channels that no longer have subscribers, bounding memory growth
    pub fn cleanup_idle_channels(&self) {
        self.channels
            .lock()
            .expect("transport channel map poisoned")
            .retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl RealtimeTransport for InMemoryTransport {
    fn subscribe(&self, channel: Channel) -> BoxFuture<'_, Result<EventStream, TransportError>> {
        Box::pin(async move {
            let rx = self.sender(channel).subscribe();
            tracing::debug!("[Transport] Subscribed to {}", channel);
            let stream = BroadcastStream::new(rx).filter_map(|result| {
                // Lagged receivers skip to the next event
                futures_util::future::ready(result.ok())
            });
            Ok(Box::pin(stream) as EventStream)
        })
    }

    fn publish(
        &self,
        channel: Channel,
        event: RealtimeEvent,
    ) -> BoxFuture<'_, Result<usize, TransportError>> {
        Box::pin(async move {
            match self.sender(channel).send(event) {
                Ok(subscriber_count) => {
                    tracing::debug!(
                        "[Transport] Event published to {} ({} subscribers)",
                        channel,
                        subscriber_count
                    );
                    Ok(subscriber_count)
                }
                Err(_) => {
                    // No subscribers, that's okay
                    tracing::debug!("[Transport] No subscribers on {}", channel);
                    Ok(0)
                }
            }
        })
    }
}
