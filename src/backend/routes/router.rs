/**
 * Router Configuration
 *
 * Mounts the coordination routes in protected-surface groups, each wrapped
 * in its own rate-limit middleware so the surfaces never share admission
 * state:
 *
 * - social: `POST /typing`, `POST /presence`
 * - messaging: `POST /threads/{id}/messages`, `POST /messages/{id}/receipt`
 * - api: `GET /realtime` (SSE subscription)
 */

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::backend::middleware::with_rate_limit;
use crate::backend::routes::handlers::{
    handle_presence_event, handle_realtime_subscription, handle_receipt, handle_send_message,
    handle_typing_event,
};
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let social = app_state.limiters.social.clone();
    let messaging = app_state.limiters.messaging.clone();
    let api = app_state.limiters.api.clone();

    let social_routes = Router::new()
        .route("/typing", post(handle_typing_event))
        .route("/presence", post(handle_presence_event))
        .layer(middleware::from_fn(move |request, next| {
            with_rate_limit(social.clone(), request, next)
        }));

    let messaging_routes = Router::new()
        .route("/threads/{thread_id}/messages", post(handle_send_message))
        .route("/messages/{message_id}/receipt", post(handle_receipt))
        .layer(middleware::from_fn(move |request, next| {
            with_rate_limit(messaging.clone(), request, next)
        }));

    let realtime_routes = Router::new()
        .route("/realtime", get(handle_realtime_subscription))
        .layer(middleware::from_fn(move |request, next| {
            with_rate_limit(api.clone(), request, next)
        }));

    Router::new()
        .merge(social_routes)
        .merge(messaging_routes)
        .merge(realtime_routes)
        .fallback(|| async { "404 Not Found" })
        .with_state(app_state)
}
