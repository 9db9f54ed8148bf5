//! Live event streams for the UI and observer clients

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// UI event stream: status updates, activity log, model lifecycle.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.curator.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|event| async move {
        match event {
            Ok(event) => SseEvent::default().json_data(&event).ok().map(Ok),
            // Lagged receivers skip ahead rather than ending the stream.
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Observer directive stream: activate/deactivate/hide frames.
pub async fn observer_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.observer.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|frame| async move {
        match frame {
            Ok(frame) => SseEvent::default().json_data(&frame).ok().map(Ok),
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
