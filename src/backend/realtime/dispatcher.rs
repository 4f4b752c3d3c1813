//! Notification Dispatcher
//!
//! Listener registry with fan-out delivery. Every inbound notification
//! event is delivered to every registered listener exactly once; filtering
//! by `user_id` is the listener's job. Listeners are not persisted across
//! process restarts and events during a disconnect window are not replayed.
//!
//! A secondary side channel raises a local desktop-style alert for new
//! notifications, gated by a permission that is requested at most once,
//! reactively, on the first eligible notification. A denied or unavailable
//! permission degrades to a silent no-op and never blocks fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::shared::{Notification, NotificationPriority};

/// Identifies one registered listener
pub type ListenerId = Uuid;

/// Callback invoked with each dispatched notification
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Result of a desktop-alert permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPermission {
    Granted,
    Denied,
}

/// A desktop-style alert handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopAlert {
    /// Alert title
    pub title: String,
    /// Alert body
    pub body: String,
    /// Whether the alert should stay until dismissed
    pub persistent: bool,
}

/// The desktop alerting facility of the host environment
pub trait AlertSink: Send + Sync {
    /// Ask the user for alert permission
    fn request_permission(&self) -> AlertPermission;

    /// Show an alert
    fn show(&self, alert: &DesktopAlert);
}

/// Sink for headless environments: permission is always denied
pub struct NoopAlerts;

impl AlertSink for NoopAlerts {
    fn request_permission(&self) -> AlertPermission {
        AlertPermission::Denied
    }

    fn show(&self, _alert: &DesktopAlert) {}
}

struct RegisteredListener {
    user_id: Uuid,
    callback: NotificationCallback,
}

/// Fans notification events out to registered listeners
pub struct NotificationDispatcher {
    listeners: Mutex<HashMap<ListenerId, RegisteredListener>>,
    alerts: Box<dyn AlertSink>,
    /// `None` until the first eligible notification triggers a request
    permission: Mutex<Option<AlertPermission>>,
}

impl NotificationDispatcher {
    /// Create a dispatcher with no desktop alerting
    pub fn new() -> Self {
        Self::with_alerts(Box::new(NoopAlerts))
    }

    /// Create a dispatcher with a desktop alert sink
    pub fn with_alerts(alerts: Box<dyn AlertSink>) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            alerts,
            permission: Mutex::new(None),
        }
    }

    /// Register a listener on behalf of a user
    ///
    /// The callback is invoked for every inbound notification event,
    /// regardless of which user triggered the subscription — filter by
    /// `notification.user_id` inside the callback.
    pub fn subscribe(&self, user_id: Uuid, callback: NotificationCallback) -> ListenerId {
        let listener_id = Uuid::new_v4();
        let mut listeners = self.listeners.lock().expect("listener map poisoned");
        listeners.insert(listener_id, RegisteredListener { user_id, callback });
        tracing::debug!(
            "[Dispatch] Listener {} registered for user {}",
            listener_id,
            user_id
        );
        listener_id
    }

    /// Remove a listener
    ///
    /// Returns whether the listener was registered. After this returns, the
    /// listener never receives another event.
    pub fn unsubscribe(&self, listener_id: ListenerId) -> bool {
        let removed = self
            .listeners
            .lock()
            .expect("listener map poisoned")
            .remove(&listener_id)
            .is_some();
        if removed {
            tracing::debug!("[Dispatch] Listener {} removed", listener_id);
        }
        removed
    }

    /// Remove every listener registered for a user (collaborator teardown)
    pub fn unsubscribe_user(&self, user_id: Uuid) -> usize {
        let mut listeners = self.listeners.lock().expect("listener map poisoned");
        let before = listeners.len();
        listeners.retain(|_, listener| listener.user_id != user_id);
        before - listeners.len()
    }

    /// Handle an inbound new-notification event
    pub fn on_new_notification(&self, notification: &Notification) {
        self.fan_out(notification);
        self.maybe_alert(notification);
    }

    /// Handle an inbound notification-update event
    ///
    /// Updates fan out but never raise alerts.
    pub fn on_notification_update(&self, notification: &Notification) {
        self.fan_out(notification);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().expect("listener map poisoned").len()
    }

    fn fan_out(&self, notification: &Notification) {
        // Clone callbacks out of the lock so a listener can (un)subscribe
        // from inside its own callback
        let callbacks: Vec<NotificationCallback> = {
            let listeners = self.listeners.lock().expect("listener map poisoned");
            listeners
                .values()
                .map(|listener| listener.callback.clone())
                .collect()
        };
        tracing::debug!(
            "[Dispatch] Notification {} fanned out to {} listeners",
            notification.id,
            callbacks.len()
        );
        for callback in callbacks {
            callback(notification);
        }
    }

    fn maybe_alert(&self, notification: &Notification) {
        let permission = {
            let mut permission = self.permission.lock().expect("permission state poisoned");
            *permission.get_or_insert_with(|| {
                tracing::debug!("[Dispatch] Requesting desktop alert permission");
                self.alerts.request_permission()
            })
        };
        if permission != AlertPermission::Granted {
            return;
        }
        self.alerts.show(&DesktopAlert {
            title: notification.title.clone(),
            body: notification.body.clone(),
            persistent: notification.priority == NotificationPriority::Urgent,
        });
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
