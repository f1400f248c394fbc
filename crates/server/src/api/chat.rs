//! Streaming chat endpoint.
//!
//! The generation task is spawned detached from the response: a client
//! that disconnects mid-stream stops receiving events, but the assistant
//! turn still runs to completion and is persisted.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Json, Router, routing::post};
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{error, warn};
use tutorium_api_types::{ChatStreamEvent, SendMessageRequest};
use tutorium_core::domain::MessageKind;

use super::error::{ApiError, parse_path_id};
use super::state::AppState;
use crate::service::StreamUpdate;

pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/conversations/{id}/stream", post(stream_message))
}

async fn stream_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let conversation_id = parse_path_id(&id, "conversation id")?;
    let kind = payload
        .kind
        .as_deref()
        .map(MessageKind::parse)
        .unwrap_or(MessageKind::Student);

    let (event_tx, event_rx) = mpsc::channel::<ChatStreamEvent>(64);
    let (update_tx, mut update_rx) = mpsc::channel::<StreamUpdate>(64);

    let forward_tx = event_tx.clone();
    tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            if forward_tx.send(to_wire_event(update)).await.is_err() {
                // Client went away; keep draining so the service side
                // never blocks on a full channel.
                continue;
            }
        }
    });

    let service = state.conversations.clone();
    let content = payload.content;
    tokio::spawn(async move {
        if let Err(err) = service
            .send_message_streaming(conversation_id, content, kind, update_tx)
            .await
        {
            error!(conversation_id = %conversation_id, error = %err, "streamed turn failed");
            let _ = event_tx
                .send(ChatStreamEvent::Error {
                    message: err.to_string(),
                })
                .await;
        }
    });

    let stream = futures_util::stream::unfold(event_rx, |mut event_rx| async move {
        let event = event_rx.recv().await?;
        Some((Ok::<_, Infallible>(to_sse_event(&event)), event_rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_wire_event(update: StreamUpdate) -> ChatStreamEvent {
    match update {
        StreamUpdate::UserMessage { id, content, kind } => ChatStreamEvent::UserMessage {
            id: id.to_string(),
            content,
            kind: kind.as_str().to_string(),
        },
        StreamUpdate::AiMessageStart { id } => ChatStreamEvent::AiMessageStart {
            id: id.to_string(),
        },
        StreamUpdate::AiToken { id, token } => ChatStreamEvent::AiToken {
            id: id.to_string(),
            token,
        },
        StreamUpdate::AiMessageComplete { id, final_content } => {
            ChatStreamEvent::AiMessageComplete {
                id: id.to_string(),
                final_content,
            }
        }
    }
}

fn to_sse_event(event: &ChatStreamEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(sse_event) => sse_event,
        Err(err) => {
            warn!(error = %err, "failed to serialize stream event");
            Event::default().data("{\"type\":\"error\",\"message\":\"serialization failed\"}")
        }
    }
}
