/**
 * Application State Management
 *
 * `AppState` is the central state container for the Axum application. Each
 * handler extracts the slice it needs through `FromRef`, following Axum's
 * recommended substate pattern, rather than taking the whole state.
 *
 * # Thread Safety
 *
 * Everything here is `Arc`-shared and internally synchronized: the transport
 * keeps its channel map behind a mutex, the limiters are lock-striped maps,
 * and the delivery tracker guards its own table.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::realtime::{DeliveryTracker, InMemoryTransport, SlidingWindowLimiter};
use crate::backend::server::config::Settings;

/// One limiter instance per protected surface
///
/// Instances never share state: exhausting the messaging quota says nothing
/// about the auth quota.
#[derive(Clone)]
pub struct RateLimiters {
    /// General API traffic
    pub api: Arc<SlidingWindowLimiter>,
    /// Authentication attempts
    pub auth: Arc<SlidingWindowLimiter>,
    /// Uploads
    pub uploads: Arc<SlidingWindowLimiter>,
    /// Social actions (typing, presence)
    pub social: Arc<SlidingWindowLimiter>,
    /// Messaging
    pub messaging: Arc<SlidingWindowLimiter>,
}

impl RateLimiters {
    /// Build the per-surface limiters from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api: Arc::new(SlidingWindowLimiter::new(settings.api_policy)),
            auth: Arc::new(SlidingWindowLimiter::new(settings.auth_policy)),
            uploads: Arc::new(SlidingWindowLimiter::new(settings.upload_policy)),
            social: Arc::new(SlidingWindowLimiter::new(settings.social_policy)),
            messaging: Arc::new(SlidingWindowLimiter::new(settings.messaging_policy)),
        }
    }

    /// Drop idle records on every surface
    pub fn cleanup(&self) {
        self.api.cleanup();
        self.auth.cleanup();
        self.uploads.cleanup();
        self.social.cleanup();
        self.messaging.cleanup();
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// The pub/sub transport backing every realtime channel
    pub transport: Arc<InMemoryTransport>,
    /// Delivery status tracking for outbound messages
    pub delivery: Arc<DeliveryTracker>,
    /// Per-surface admission control
    pub limiters: RateLimiters,
    /// Runtime settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the application state from settings
    pub fn new(settings: Settings) -> Self {
        Self {
            transport: Arc::new(InMemoryTransport::new(settings.channel_capacity)),
            delivery: Arc::new(DeliveryTracker::new()),
            limiters: RateLimiters::from_settings(&settings),
            settings: Arc::new(settings),
        }
    }
}

impl FromRef<AppState> for Arc<InMemoryTransport> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.transport.clone()
    }
}

impl FromRef<AppState> for Arc<DeliveryTracker> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.delivery.clone()
    }
}

impl FromRef<AppState> for RateLimiters {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.limiters.clone()
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.settings.clone()
    }
}
