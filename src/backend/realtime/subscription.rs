//! Subscription Manager
//!
//! Owns the lifecycle of pub/sub channel subscriptions for one session:
//! connect, resubscribe on thread change, reconnect with backoff, teardown.
//! Every inbound event is demultiplexed to the presence coordinator, the
//! notification dispatcher, the delivery tracker, or a raw callback, so
//! consumers never need transport-level knowledge.
//!
//! # Connection state machine
//!
//! Each channel runs one spawned task moving through
//! `connecting -> connected -> reconnecting -> closed`. On a transport-level
//! disconnect the task retries with exponential backoff and jitter; the
//! attempt counter resets on a successful connect, and retries stop at the
//! policy's bound. Status transitions are reported through the
//! connection-status callback so UI layers can show degraded-mode
//! indicators.
//!
//! # Thread switching
//!
//! Switching the active thread unsubscribes the previous thread-scoped
//! channels before subscribing the new ones; subscribing first would
//! deliver duplicate events during the overlap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::realtime::delivery::DeliveryTracker;
use crate::backend::realtime::dispatcher::NotificationDispatcher;
use crate::backend::realtime::presence::PresenceCoordinator;
use crate::backend::realtime::transport::{Channel, RealtimeTransport};
use crate::shared::{ChatMessage, MessageUpdate, RealtimeEvent, ThreadSummary};

/// Connection state of one channel subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Upper bound on the delay between retries
    pub max: Duration,
    /// Retries after this many consecutive failures stop and the channel
    /// closes
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max);
        // Up to 10% jitter to avoid a thundering herd on shared outages
        let jitter_ms = delay.as_millis() as u64 / 10;
        delay + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

/// Callback invoked on connection status transitions
pub type ConnectionCallback = Arc<dyn Fn(Channel, ConnectionStatus) + Send + Sync>;
/// Callback invoked with each new message
pub type MessageCallback = Arc<dyn Fn(&ChatMessage) + Send + Sync>;
/// Callback invoked with each message update
pub type MessageUpdateCallback = Arc<dyn Fn(&MessageUpdate) + Send + Sync>;
/// Callback invoked with new-thread and thread-update events
pub type ThreadCallback = Arc<dyn Fn(&ThreadSummary) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_new_message: Mutex<Option<MessageCallback>>,
    on_message_update: Mutex<Option<MessageUpdateCallback>>,
    on_new_thread: Mutex<Option<ThreadCallback>>,
    on_thread_update: Mutex<Option<ThreadCallback>>,
    on_connection_change: Mutex<Option<ConnectionCallback>>,
}

impl Callbacks {
    fn clear(&self) {
        *self.on_new_message.lock().expect("callback poisoned") = None;
        *self.on_message_update.lock().expect("callback poisoned") = None;
        *self.on_new_thread.lock().expect("callback poisoned") = None;
        *self.on_thread_update.lock().expect("callback poisoned") = None;
        *self.on_connection_change.lock().expect("callback poisoned") = None;
    }
}

#[derive(Debug)]
struct ChannelState {
    status: ConnectionStatus,
    reconnect_attempts: u32,
}

struct ChannelHandle {
    state: Arc<Mutex<ChannelState>>,
    task: JoinHandle<()>,
}

struct Inner {
    transport: Arc<dyn RealtimeTransport>,
    coordinator: Arc<PresenceCoordinator>,
    dispatcher: Arc<NotificationDispatcher>,
    delivery: Arc<DeliveryTracker>,
    callbacks: Callbacks,
    backoff: BackoffPolicy,
}

impl Inner {
    fn set_status(&self, channel: Channel, state: &Mutex<ChannelState>, status: ConnectionStatus) {
        state.lock().expect("channel state poisoned").status = status;
        tracing::debug!("[Subscribe] {} -> {:?}", channel, status);
        let callback = self
            .callbacks
            .on_connection_change
            .lock()
            .expect("callback poisoned")
            .clone();
        if let Some(callback) = callback {
            callback(channel, status);
        }
    }

    /// Route one inbound event to its consumer
    fn route(&self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::Typing(signal) => {
                self.coordinator
                    .on_typing_event(signal.thread_id, signal.user_id, signal.is_typing);
            }
            RealtimeEvent::Presence(update) => {
                self.coordinator.on_presence_event(update.user_id, update.status);
            }
            RealtimeEvent::NewNotification(notification) => {
                self.dispatcher.on_new_notification(&notification);
            }
            RealtimeEvent::NotificationUpdate(notification) => {
                self.dispatcher.on_notification_update(&notification);
            }
            RealtimeEvent::MessageUpdate(update) => {
                if let Some(state) = update.delivery {
                    self.delivery.apply_ack(update.message_id, state);
                }
                let callback = self
                    .callbacks
                    .on_message_update
                    .lock()
                    .expect("callback poisoned")
                    .clone();
                if let Some(callback) = callback {
                    callback(&update);
                }
            }
            RealtimeEvent::NewMessage(message) => {
                let callback = self
                    .callbacks
                    .on_new_message
                    .lock()
                    .expect("callback poisoned")
                    .clone();
                if let Some(callback) = callback {
                    callback(&message);
                }
            }
            RealtimeEvent::NewThread(thread) => {
                let callback = self
                    .callbacks
                    .on_new_thread
                    .lock()
                    .expect("callback poisoned")
                    .clone();
                if let Some(callback) = callback {
                    callback(&thread);
                }
            }
            RealtimeEvent::ThreadUpdate(thread) => {
                let callback = self
                    .callbacks
                    .on_thread_update
                    .lock()
                    .expect("callback poisoned")
                    .clone();
                if let Some(callback) = callback {
                    callback(&thread);
                }
            }
        }
    }

    /// Per-channel connection loop: subscribe, consume, reconnect with
    /// backoff until the attempt bound is reached
    async fn run_channel(self: Arc<Self>, channel: Channel, state: Arc<Mutex<ChannelState>>) {
        let mut attempt: u32 = 0;
        loop {
            let connecting = if attempt == 0 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting
            };
            self.set_status(channel, &state, connecting);

            match self.transport.subscribe(channel).await {
                Ok(mut stream) => {
                    attempt = 0;
                    state.lock().expect("channel state poisoned").reconnect_attempts = 0;
                    self.set_status(channel, &state, ConnectionStatus::Connected);

                    while let Some(event) = stream.next().await {
                        self.route(event);
                    }
                    tracing::warn!("[Subscribe] Stream ended on {}, will reconnect", channel);
                }
                Err(e) => {
                    tracing::warn!("[Subscribe] Subscribe failed on {}: {}", channel, e);
                }
            }

            attempt += 1;
            state.lock().expect("channel state poisoned").reconnect_attempts = attempt;
            if attempt > self.backoff.max_attempts {
                tracing::error!(
                    "[Subscribe] Giving up on {} after {} attempts",
                    channel,
                    self.backoff.max_attempts
                );
                self.set_status(channel, &state, ConnectionStatus::Closed);
                return;
            }
            tokio::time::sleep(self.backoff.delay(attempt)).await;
        }
    }
}

/// Manages all channel subscriptions for one session
pub struct SubscriptionManager {
    user_id: Uuid,
    inner: Arc<Inner>,
    channels: Mutex<HashMap<Channel, ChannelHandle>>,
    active_thread: Mutex<Option<Uuid>>,
}

impl SubscriptionManager {
    /// Create a manager for `user_id`'s session
    pub fn new(
        user_id: Uuid,
        transport: Arc<dyn RealtimeTransport>,
        coordinator: Arc<PresenceCoordinator>,
        dispatcher: Arc<NotificationDispatcher>,
        delivery: Arc<DeliveryTracker>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            user_id,
            inner: Arc::new(Inner {
                transport,
                coordinator,
                dispatcher,
                delivery,
                callbacks: Callbacks::default(),
                backoff,
            }),
            channels: Mutex::new(HashMap::new()),
            active_thread: Mutex::new(None),
        }
    }

    /// Open the per-user channels: thread list, notifications, presence
    pub fn start(&self) {
        self.subscribe_channel(Channel::Threads(self.user_id));
        self.subscribe_channel(Channel::Notifications(self.user_id));
        self.subscribe_channel(Channel::Presence(self.user_id));
    }

    /// Switch the active thread
    ///
    /// Unsubscribes the previous thread's message and typing channels
    /// before subscribing the new ones, so no event is delivered twice and
    /// no stale typing entries keep refreshing.
    pub fn set_active_thread(&self, thread_id: Option<Uuid>) {
        let previous = {
            let mut active = self.active_thread.lock().expect("active thread poisoned");
            std::mem::replace(&mut *active, thread_id)
        };
        if previous == thread_id {
            return;
        }
        if let Some(previous) = previous {
            self.unsubscribe_channel(Channel::Thread(previous));
            self.unsubscribe_channel(Channel::ThreadTyping(previous));
        }
        if let Some(thread_id) = thread_id {
            self.subscribe_channel(Channel::Thread(thread_id));
            self.subscribe_channel(Channel::ThreadTyping(thread_id));
        }
    }

    /// Current status of a channel, if subscribed
    pub fn status(&self, channel: Channel) -> Option<ConnectionStatus> {
        self.channels
            .lock()
            .expect("channel map poisoned")
            .get(&channel)
            .map(|handle| handle.state.lock().expect("channel state poisoned").status)
    }

    /// Consecutive failed reconnect attempts on a channel
    pub fn reconnect_attempts(&self, channel: Channel) -> Option<u32> {
        self.channels
            .lock()
            .expect("channel map poisoned")
            .get(&channel)
            .map(|handle| {
                handle
                    .state
                    .lock()
                    .expect("channel state poisoned")
                    .reconnect_attempts
            })
    }

    /// Register the new-message callback
    pub fn set_on_new_message(&self, callback: MessageCallback) {
        *self
            .inner
            .callbacks
            .on_new_message
            .lock()
            .expect("callback poisoned") = Some(callback);
    }

    /// Register the message-update callback
    pub fn set_on_message_update(&self, callback: MessageUpdateCallback) {
        *self
            .inner
            .callbacks
            .on_message_update
            .lock()
            .expect("callback poisoned") = Some(callback);
    }

    /// Register the new-thread callback
    pub fn set_on_new_thread(&self, callback: ThreadCallback) {
        *self
            .inner
            .callbacks
            .on_new_thread
            .lock()
            .expect("callback poisoned") = Some(callback);
    }

    /// Register the thread-update callback
    pub fn set_on_thread_update(&self, callback: ThreadCallback) {
        *self
            .inner
            .callbacks
            .on_thread_update
            .lock()
            .expect("callback poisoned") = Some(callback);
    }

    /// Register the connection-status callback
    pub fn set_on_connection_change(&self, callback: ConnectionCallback) {
        *self
            .inner
            .callbacks
            .on_connection_change
            .lock()
            .expect("callback poisoned") = Some(callback);
    }

    /// Tear down the session
    ///
    /// Publishes the local user's `offline` presence, closes every channel,
    /// and clears all registered callbacks. No subscription survives the
    /// owning session.
    pub async fn destroy(&self) {
        self.inner.coordinator.publish_offline().await;

        let handles: Vec<(Channel, ChannelHandle)> = self
            .channels
            .lock()
            .expect("channel map poisoned")
            .drain()
            .collect();
        for (channel, handle) in handles {
            handle.task.abort();
            self.inner
                .set_status(channel, &handle.state, ConnectionStatus::Closed);
        }
        self.inner.callbacks.clear();
        tracing::info!("[Subscribe] Session for user {} destroyed", self.user_id);
    }

    fn subscribe_channel(&self, channel: Channel) {
        let mut channels = self.channels.lock().expect("channel map poisoned");
        if channels.contains_key(&channel) {
            return;
        }
        let state = Arc::new(Mutex::new(ChannelState {
            status: ConnectionStatus::Connecting,
            reconnect_attempts: 0,
        }));
        let task = tokio::spawn(Arc::clone(&self.inner).run_channel(channel, state.clone()));
        channels.insert(channel, ChannelHandle { state, task });
    }

    fn unsubscribe_channel(&self, channel: Channel) {
        let handle = self
            .channels
            .lock()
            .expect("channel map poisoned")
            .remove(&channel);
        if let Some(handle) = handle {
            handle.task.abort();
            self.inner
                .set_status(channel, &handle.state, ConnectionStatus::Closed);
        }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        // Leaked channels keep consuming transport resources; abort what
        // destroy() did not get to
        if let Ok(channels) = self.channels.lock() {
            for handle in channels.values() {
                handle.task.abort();
            }
        }
    }
}
