/**
 * Request Handlers
 *
 * Thin handlers over the coordination core: each one validates a payload,
 * updates the relevant tracker, and publishes the corresponding event
 * through the transport. All realtime consumption happens over the SSE
 * subscription endpoint.
 */

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::realtime::{Channel, DeliveryTracker, InMemoryTransport, RealtimeTransport};
use crate::shared::{ChatMessage, DeliveryState, PresenceStatus, RealtimeEvent};

/// Typing indicator payload
#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub thread_id: Uuid,
    pub user_id: Uuid,
    pub is_typing: bool,
}

/// `POST /typing` - publish a typing signal to the thread's typing channel
pub async fn handle_typing_event(
    State(transport): State<Arc<InMemoryTransport>>,
    Json(request): Json<TypingRequest>,
) -> Result<StatusCode, BackendError> {
    tracing::debug!(
        "[Realtime] Typing signal: user {} in thread {} ({})",
        request.user_id,
        request.thread_id,
        request.is_typing
    );
    transport
        .publish(
            Channel::ThreadTyping(request.thread_id),
            RealtimeEvent::typing(request.thread_id, request.user_id, request.is_typing),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Presence announcement payload
#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    pub user_id: Uuid,
    pub status: PresenceStatus,
}

/// `POST /presence` - publish a presence announcement
pub async fn handle_presence_event(
    State(transport): State<Arc<InMemoryTransport>>,
    Json(request): Json<PresenceRequest>,
) -> Result<StatusCode, BackendError> {
    transport
        .publish(
            Channel::Presence(request.user_id),
            RealtimeEvent::presence(request.user_id, request.status),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Message send payload
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
}

/// `POST /threads/{thread_id}/messages` - record the send and publish
/// `new-message` to the thread channel
pub async fn handle_send_message(
    State(transport): State<Arc<InMemoryTransport>>,
    State(delivery): State<Arc<DeliveryTracker>>,
    Path(thread_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), BackendError> {
    if request.content.trim().is_empty() {
        return Err(BackendError::bad_request("Message content is empty"));
    }

    let message = ChatMessage::new(
        thread_id,
        request.sender_id,
        request.recipient_id,
        request.content,
    );
    delivery.record_sent(message.id, message.recipient_id);
    transport
        .publish(
            Channel::Thread(thread_id),
            RealtimeEvent::NewMessage(message.clone()),
        )
        .await?;

    tracing::info!("[Realtime] Message {} sent to thread {}", message.id, thread_id);
    Ok((StatusCode::CREATED, Json(message)))
}

/// Delivery receipt payload
#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub thread_id: Uuid,
    pub state: DeliveryState,
}

/// `POST /messages/{message_id}/receipt` - apply a delivery acknowledgement
/// and publish the matching `message-update`
pub async fn handle_receipt(
    State(transport): State<Arc<InMemoryTransport>>,
    State(delivery): State<Arc<DeliveryTracker>>,
    Path(message_id): Path<Uuid>,
    Json(request): Json<ReceiptRequest>,
) -> Result<StatusCode, BackendError> {
    if request.state == DeliveryState::Sent {
        return Err(BackendError::bad_request(
            "'sent' is not an acknowledgement state",
        ));
    }

    delivery.apply_ack(message_id, request.state);
    transport
        .publish(
            Channel::Thread(request.thread_id),
            RealtimeEvent::delivery_ack(message_id, request.thread_id, request.state),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the realtime subscription
#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    /// Wire-form channel name, e.g. `thread:<uuid>`
    pub channel: String,
}

/// `GET /realtime?channel=<name>` - SSE subscription to one channel
///
/// Each event is emitted with its wire kind as the SSE event name and the
/// serialized event as data. Axum's keep-alive injects comment lines, so
/// quiet channels do not need synthetic events.
pub async fn handle_realtime_subscription(
    State(transport): State<Arc<InMemoryTransport>>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, BackendError> {
    let channel: Channel = query.channel.parse().map_err(BackendError::from)?;
    tracing::info!("[Realtime] SSE subscription to {}", channel);

    let stream = transport.subscribe(channel).await?;
    let sse_stream = stream.filter_map(|event| {
        let item = match serde_json::to_string(&event) {
            Ok(data) => Some(Ok(Event::default().event(event.kind()).data(data))),
            Err(e) => {
                tracing::error!("[Realtime] Failed to serialize event: {:?}", e);
                None
            }
        };
        futures_util::future::ready(item)
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
