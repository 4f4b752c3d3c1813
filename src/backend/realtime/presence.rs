//! Presence & Typing Coordinator
//!
//! Maintains ephemeral, TTL-bounded shared state: who is online and who is
//! typing in which thread. The coordinator is both a consumer and a
//! producer of the presence stream — presence is a consensus built from
//! every participant announcing its own state, so the local session derives
//! its own transitions (visibility changes, teardown) and publishes them
//! back through the transport.
//!
//! Typing entries expire by timestamp inspection against a liveness
//! threshold rather than by cancellable timers, so a dropped stop-typing
//! event cannot wedge a user into "typing" forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::backend::realtime::transport::{Channel, RealtimeTransport};
use crate::shared::{PresenceRecord, PresenceStatus, RealtimeEvent};

/// Coordinates typing indicators and presence for one session
pub struct PresenceCoordinator {
    local_user: Uuid,
    transport: Arc<dyn RealtimeTransport>,
    liveness: Duration,
    typing: Mutex<HashMap<(Uuid, Uuid), Instant>>,
    presence: Mutex<HashMap<Uuid, PresenceRecord>>,
}

impl PresenceCoordinator {
    /// Create a coordinator for `local_user`
    ///
    /// `liveness` is the maximum silence interval after which a typing
    /// entry is presumed stale.
    pub fn new(
        local_user: Uuid,
        transport: Arc<dyn RealtimeTransport>,
        liveness: Duration,
    ) -> Self {
        Self {
            local_user,
            transport,
            liveness,
            typing: Mutex::new(HashMap::new()),
            presence: Mutex::new(HashMap::new()),
        }
    }

    /// Handle an inbound typing signal
    ///
    /// `is_typing = true` inserts or refreshes the entry; `false` deletes it.
    pub fn on_typing_event(&self, thread_id: Uuid, user_id: Uuid, is_typing: bool) {
        self.on_typing_event_at(thread_id, user_id, is_typing, Instant::now());
    }

    /// `on_typing_event` against an explicit clock reading
    pub fn on_typing_event_at(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
        now: Instant,
    ) {
        let mut typing = self.typing.lock().expect("typing map poisoned");
        if is_typing {
            typing.insert((thread_id, user_id), now);
        } else {
            typing.remove(&(thread_id, user_id));
        }
    }

    /// Users actively typing in a thread
    ///
    /// Entries older than the liveness threshold are treated as absent and
    /// dropped, whether or not a stop event ever arrived.
    pub fn typing_users(&self, thread_id: Uuid) -> Vec<Uuid> {
        self.typing_users_at(thread_id, Instant::now())
    }

    /// `typing_users` against an explicit clock reading
    pub fn typing_users_at(&self, thread_id: Uuid, now: Instant) -> Vec<Uuid> {
        let mut typing = self.typing.lock().expect("typing map poisoned");
        typing.retain(|_, &mut started_at| now.duration_since(started_at) < self.liveness);
        typing
            .keys()
            .filter(|(thread, _)| *thread == thread_id)
            .map(|(_, user)| *user)
            .collect()
    }

    /// Handle an inbound presence announcement
    pub fn on_presence_event(&self, user_id: Uuid, status: PresenceStatus) {
        let mut presence = self.presence.lock().expect("presence map poisoned");
        presence.insert(user_id, PresenceRecord::now(status));
    }

    /// Last-known presence of a user
    pub fn presence(&self, user_id: Uuid) -> Option<PresenceRecord> {
        self.presence
            .lock()
            .expect("presence map poisoned")
            .get(&user_id)
            .cloned()
    }

    /// Users currently announced as online
    pub fn online_users(&self) -> Vec<Uuid> {
        self.presence
            .lock()
            .expect("presence map poisoned")
            .iter()
            .filter(|(_, record)| record.status == PresenceStatus::Online)
            .map(|(user, _)| *user)
            .collect()
    }

    /// Derive local presence from a UI visibility change
    ///
    /// Foreground publishes `online`, background publishes `away`. This is
    /// a synthetic transition generated locally rather than relying on the
    /// transport's own disconnect detection.
    pub async fn set_visibility(&self, visible: bool) {
        let status = if visible {
            PresenceStatus::Online
        } else {
            PresenceStatus::Away
        };
        self.publish_own_status(status).await;
    }

    /// Publish the local user's `offline` transition on session teardown
    pub async fn publish_offline(&self) {
        self.publish_own_status(PresenceStatus::Offline).await;
    }

    /// Publish a typing indicator for the local session
    pub async fn send_typing_indicator(&self, thread_id: Uuid, is_typing: bool) {
        let event = RealtimeEvent::typing(thread_id, self.local_user, is_typing);
        if let Err(e) = self
            .transport
            .publish(Channel::ThreadTyping(thread_id), event)
            .await
        {
            tracing::warn!("[Presence] Failed to publish typing indicator: {}", e);
        }
    }

    async fn publish_own_status(&self, status: PresenceStatus) {
        self.on_presence_event(self.local_user, status);
        let event = RealtimeEvent::presence(self.local_user, status);
        if let Err(e) = self
            .transport
            .publish(Channel::Presence(self.local_user), event)
            .await
        {
            tracing::warn!("[Presence] Failed to publish presence: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realtime::transport::InMemoryTransport;
    use futures_util::StreamExt;

    fn coordinator(liveness_ms: u64) -> (PresenceCoordinator, Arc<InMemoryTransport>, Uuid) {
        let transport = Arc::new(InMemoryTransport::default());
        let local_user = Uuid::new_v4();
        let coordinator = PresenceCoordinator::new(
            local_user,
            transport.clone(),
            Duration::from_millis(liveness_ms),
        );
        (coordinator, transport, local_user)
    }

    #[test]
    fn test_typing_start_and_stop() {
        let (coordinator, _, _) = coordinator(5_000);
        let thread = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Instant::now();

        coordinator.on_typing_event_at(thread, user, true, now);
        assert_eq!(coordinator.typing_users_at(thread, now), vec![user]);

        coordinator.on_typing_event_at(thread, user, false, now);
        assert!(coordinator.typing_users_at(thread, now).is_empty());
    }

    #[test]
    fn test_typing_expires_without_stop_event() {
        let (coordinator, _, _) = coordinator(5_000);
        let thread = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Instant::now();

        coordinator.on_typing_event_at(thread, user, true, now);
        let within = now + Duration::from_millis(4_999);
        assert_eq!(coordinator.typing_users_at(thread, within), vec![user]);

        let past = now + Duration::from_millis(5_001);
        assert!(coordinator.typing_users_at(thread, past).is_empty());
    }

    #[test]
    fn test_typing_refresh_extends_liveness() {
        let (coordinator, _, _) = coordinator(5_000);
        let thread = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Instant::now();

        coordinator.on_typing_event_at(thread, user, true, now);
        let refresh = now + Duration::from_millis(4_000);
        coordinator.on_typing_event_at(thread, user, true, refresh);

        let later = now + Duration::from_millis(8_000);
        assert_eq!(coordinator.typing_users_at(thread, later), vec![user]);
    }

    #[test]
    fn test_typing_scoped_to_thread() {
        let (coordinator, _, _) = coordinator(5_000);
        let thread_a = Uuid::new_v4();
        let thread_b = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Instant::now();

        coordinator.on_typing_event_at(thread_a, user, true, now);
        assert!(coordinator.typing_users_at(thread_b, now).is_empty());
    }

    #[test]
    fn test_presence_replaces_record() {
        let (coordinator, _, _) = coordinator(5_000);
        let user = Uuid::new_v4();

        coordinator.on_presence_event(user, PresenceStatus::Online);
        assert_eq!(coordinator.online_users(), vec![user]);

        coordinator.on_presence_event(user, PresenceStatus::Busy);
        assert!(coordinator.online_users().is_empty());
        assert_eq!(
            coordinator.presence(user).unwrap().status,
            PresenceStatus::Busy
        );
    }

    #[tokio::test]
    async fn test_visibility_publishes_presence() {
        let (coordinator, transport, local_user) = coordinator(5_000);
        let mut stream = transport
            .subscribe(Channel::Presence(local_user))
            .await
            .unwrap();

        coordinator.set_visibility(false).await;
        let event = stream.next().await.unwrap();
        assert_eq!(
            event,
            RealtimeEvent::presence(local_user, PresenceStatus::Away)
        );
        assert_eq!(
            coordinator.presence(local_user).unwrap().status,
            PresenceStatus::Away
        );

        coordinator.set_visibility(true).await;
        let event = stream.next().await.unwrap();
        assert_eq!(
            event,
            RealtimeEvent::presence(local_user, PresenceStatus::Online)
        );
    }

    #[tokio::test]
    async fn test_publish_offline() {
        let (coordinator, transport, local_user) = coordinator(5_000);
        let mut stream = transport
            .subscribe(Channel::Presence(local_user))
            .await
            .unwrap();

        coordinator.publish_offline().await;
        let event = stream.next().await.unwrap();
        assert_eq!(
            event,
            RealtimeEvent::presence(local_user, PresenceStatus::Offline)
        );
    }

    #[tokio::test]
    async fn test_send_typing_indicator_publishes() {
        let (coordinator, transport, local_user) = coordinator(5_000);
        let thread = Uuid::new_v4();
        let mut stream = transport
            .subscribe(Channel::ThreadTyping(thread))
            .await
            .unwrap();

        coordinator.send_typing_indicator(thread, true).await;
        let event = stream.next().await.unwrap();
        assert_eq!(event, RealtimeEvent::typing(thread, local_user, true));
    }
}
