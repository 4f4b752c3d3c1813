//! End-to-end realtime flow tests
//!
//! Exercises the HTTP surface against the shared state it mutates: message
//! sends, delivery receipts, typing signals, and the SSE subscription
//! endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use gemflow::backend::realtime::{Channel, RealtimeTransport};
use gemflow::backend::routes::router::create_router;
use gemflow::backend::server::config::Settings;
use gemflow::backend::server::state::AppState;
use gemflow::shared::{ChatMessage, DeliveryState, RealtimeEvent};

fn setup() -> (AppState, axum::Router) {
    let state = AppState::new(Settings::default());
    let router = create_router(state.clone());
    (state, router)
}

fn post_json(uri: String, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_send_message_records_and_publishes() {
    let (state, app) = setup();
    let thread_id = Uuid::new_v4();
    let recipient_id = Uuid::new_v4();

    let mut stream = state
        .transport
        .subscribe(Channel::Thread(thread_id))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            format!("/threads/{}/messages", thread_id),
            json!({
                "sender_id": Uuid::new_v4(),
                "recipient_id": recipient_id,
                "content": "The sapphire arrived, quote is ready",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let message: ChatMessage = serde_json::from_slice(&body).unwrap();
    assert_eq!(message.thread_id, thread_id);

    // Tracked as sent
    let status = state.delivery.status(message.id).unwrap();
    assert_eq!(status.state, DeliveryState::Sent);
    assert_eq!(status.recipient_id, recipient_id);

    // Published to the thread channel
    let event = stream.next().await.unwrap();
    assert_eq!(event, RealtimeEvent::NewMessage(message));
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let (_, app) = setup();
    let response = app
        .oneshot(post_json(
            format!("/threads/{}/messages", Uuid::new_v4()),
            json!({
                "sender_id": Uuid::new_v4(),
                "recipient_id": Uuid::new_v4(),
                "content": "   ",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receipt_advances_delivery_state() {
    let (state, app) = setup();
    let thread_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();
    state.delivery.record_sent(message_id, Uuid::new_v4());

    let mut stream = state
        .transport
        .subscribe(Channel::Thread(thread_id))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            format!("/messages/{}/receipt", message_id),
            json!({ "thread_id": thread_id, "state": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        state.delivery.status(message_id).unwrap().state,
        DeliveryState::Delivered
    );

    let event = stream.next().await.unwrap();
    assert_eq!(
        event,
        RealtimeEvent::delivery_ack(message_id, thread_id, DeliveryState::Delivered)
    );

    // Out-of-order ack over HTTP is absorbed silently
    let response = app
        .oneshot(post_json(
            format!("/messages/{}/receipt", message_id),
            json!({ "thread_id": thread_id, "state": "failed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        state.delivery.status(message_id).unwrap().state,
        DeliveryState::Delivered
    );
}

#[tokio::test]
async fn test_sent_receipt_is_a_bad_request() {
    let (_, app) = setup();
    let response = app
        .oneshot(post_json(
            format!("/messages/{}/receipt", Uuid::new_v4()),
            json!({ "thread_id": Uuid::new_v4(), "state": "sent" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_typing_roundtrip_through_http() {
    let (state, app) = setup();
    let thread_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut stream = state
        .transport
        .subscribe(Channel::ThreadTyping(thread_id))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/typing".to_string(),
            json!({ "thread_id": thread_id, "user_id": user_id, "is_typing": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let event = stream.next().await.unwrap();
    assert_eq!(event, RealtimeEvent::typing(thread_id, user_id, true));
}

#[tokio::test]
async fn test_sse_subscription_opens_event_stream() {
    let (_, app) = setup();
    let request = Request::builder()
        .method("GET")
        .uri(format!("/realtime?channel=thread:{}", Uuid::new_v4()))
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_sse_subscription_rejects_bad_channel() {
    let (_, app) = setup();
    let request = Request::builder()
        .method("GET")
        .uri("/realtime?channel=orders:everything")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
