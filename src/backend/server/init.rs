/**
 * Server Initialization
 *
 * Wires settings, state, and routes into a ready-to-serve Axum router and
 * starts the periodic cleanup task that bounds memory growth of the
 * limiters and the transport's channel map.
 *
 * Initialization is resilient: configuration problems degrade to defaults
 * and nothing here can fail startup.
 */

use axum::Router;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::Settings;
use crate::backend::server::state::AppState;

/// Create and configure the Axum application
///
/// Builds the shared state (transport, limiters, delivery tracker), mounts
/// the routes, and spawns the periodic cleanup task.
pub async fn create_app(settings: Settings) -> Router<()> {
    tracing::info!("Initializing gemflow coordination server");

    let app_state = AppState::new(settings);
    let app = create_router(app_state.clone());

    // Idle rate-limit records and subscriber-less channels accumulate
    // without this
    let cleanup_interval = app_state.settings.cleanup_interval;
    let cleanup_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_state.limiters.cleanup();
            cleanup_state.transport.cleanup_idle_channels();
            tracing::debug!("[Cleanup] Dropped idle rate-limit records and channels");
        }
    });

    tracing::info!("Router configured with periodic cleanup task");

    app
}
