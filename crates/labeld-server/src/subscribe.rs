//! The live label subscription.
//!
//! A subscriber optionally supplies a cursor. With a valid cursor the
//! connection first replays the historical log from the store, then joins
//! the live tail; registration happens under the broadcaster mutex at an
//! observed max id, so the replay range and the live queue meet exactly at
//! the boundary with no gap and no overlap.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use std::collections::HashMap;

use labeld_core::Frame;
use labeld_store::Store;

use crate::broadcast::LABELS_STREAM;
use crate::error::{CONSUMER_TOO_SLOW, FUTURE_CURSOR, INTERNAL_SERVER_ERROR};
use crate::service::AppState;

/// Labels fetched per store round-trip during replay.
const REPLAY_BATCH: usize = 500;

/// GET /xrpc/com.atproto.label.subscribeLabels
pub async fn subscribe_labels(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    // A missing or unparseable cursor means "live tail from now".
    let cursor = params.get("cursor").and_then(|c| c.parse::<i64>().ok());
    ws.on_upgrade(move |socket| run_subscription(socket, state, cursor))
}

async fn run_subscription(mut socket: WebSocket, state: AppState, cursor: Option<i64>) {
    // Register under the same mutex the sequencer publishes under: every
    // label with id <= joined_max belongs to replay, everything after it
    // will arrive on the queue.
    let (sub_id, mut rx, joined_max) = {
        let mut registry = state.broadcaster.lock().await;
        let joined_max = match state.store.max_id().await {
            Ok(max) => max,
            Err(e) => {
                drop(registry);
                tracing::error!(error = %e, "store probe failed at subscribe");
                send_error_frame(&mut socket, INTERNAL_SERVER_ERROR, "store unavailable").await;
                return;
            }
        };

        if let Some(c) = cursor {
            if c > joined_max {
                drop(registry);
                send_error_frame(
                    &mut socket,
                    FUTURE_CURSOR,
                    format!("cursor {c} is ahead of the log (max {joined_max})"),
                )
                .await;
                return;
            }
        }

        let (sub_id, rx) = registry.subscribe(LABELS_STREAM);
        (sub_id, rx, joined_max)
    };

    tracing::info!(subscriber = sub_id, cursor = ?cursor, "subscriber connected");

    // Historical replay: (cursor, joined_max], batched.
    if let Some(cursor) = cursor {
        if !replay(&mut socket, &state, cursor, joined_max).await {
            state.broadcaster.unsubscribe(LABELS_STREAM, sub_id).await;
            return;
        }
    }

    // Live tail.
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if socket.send(Message::Binary(frame.into())).await.is_err() {
                        break;
                    }
                }
                // The sender is only dropped when the broadcaster evicted
                // us for falling behind.
                None => {
                    tracing::warn!(subscriber = sub_id, "subscriber too slow, closing");
                    send_error_frame(&mut socket, CONSUMER_TOO_SLOW, "frame queue overflow").await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(subscriber = sub_id, error = %e, "socket error");
                    break;
                }
                // Subscribers have nothing to say; ignore stray messages.
                Some(Ok(_)) => {}
            },
        }
    }

    state.broadcaster.unsubscribe(LABELS_STREAM, sub_id).await;
    tracing::info!(subscriber = sub_id, "subscriber disconnected");
}

/// Stream stored labels with `cursor < id <= joined_max` in id order.
/// Returns false when the connection should be torn down.
async fn replay(socket: &mut WebSocket, state: &AppState, cursor: i64, joined_max: i64) -> bool {
    let mut after = cursor;
    while after < joined_max {
        let batch = match state.store.scan(after, REPLAY_BATCH).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "replay scan failed");
                send_error_frame(socket, INTERNAL_SERVER_ERROR, "replay failed").await;
                return false;
            }
        };

        for stored in &batch {
            if stored.id > joined_max {
                // Ids past the join point are already queued live.
                return true;
            }
            let frame = match Frame::from_stored(stored).encode() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(id = stored.id, error = %e, "frame encoding failed");
                    send_error_frame(socket, INTERNAL_SERVER_ERROR, "replay failed").await;
                    return false;
                }
            };
            if socket.send(Message::Binary(frame.into())).await.is_err() {
                return false;
            }
            after = stored.id;
        }

        if batch.len() < REPLAY_BATCH {
            break;
        }
    }
    true
}

/// Send a framed error, then close. Best-effort: the peer may be gone.
async fn send_error_frame(socket: &mut WebSocket, kind: &str, message: impl Into<String>) {
    if let Ok(frame) = Frame::error(kind, message).encode() {
        let _ = socket.send(Message::Binary(frame.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}
