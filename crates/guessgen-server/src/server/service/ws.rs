//! WebSocket subscriptions to job progress.
//!
//! Clients send `{"event": "subscribe", "task_id": "<job id>"}`. The server
//! acknowledges with a `subscribed` frame and then pushes every progress
//! event for that job as `{"event": "task_update:<job id>", "data": {..}}`.
//! A job that already completed is answered with a single update carrying
//! the stored result. One connection may subscribe to several jobs.

use super::handler::JobService;
use crate::server::relay::listener::Subscription;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use guessgen_core::{JobId, ProgressEvent};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};

/// Frames buffered per connection before updates are dropped.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe {
        #[serde(default)]
        task_id: Option<String>,
    },
}

fn subscribed_frame(job_id: JobId) -> Value {
    json!({
        "event": "subscribed",
        "data": { "success": true, "message": format!("Subscribed to task {job_id}") },
    })
}

fn update_frame(event: &ProgressEvent) -> Value {
    json!({
        "event": format!("task_update:{}", event.job_id),
        "data": event,
    })
}

fn error_frame(error: impl Into<String>) -> Value {
    json!({ "event": "error", "data": { "error": error.into() } })
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(service): State<Arc<JobService>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: Arc<JobService>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Value>(CONNECTION_CHANNEL_BUFFER);
    tracing::debug!("WebSocket connection established");

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut forwarders = Vec::new();
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                for frame in handle_text(&service, text.as_str(), &tx, &mut forwarders) {
                    if tx.try_send(frame).is_err() {
                        tracing::warn!("Dropping frame: connection channel full or closed");
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!("WebSocket error: {e}");
                break;
            }
            // Pings are answered by axum.
            _ => {}
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
    send_task.abort();
    tracing::debug!("WebSocket connection closed");
}

/// Handles one client frame and returns the immediate replies. Live
/// subscriptions instead spawn a forwarder that acknowledges and then
/// streams updates through `tx`.
fn handle_text(
    service: &JobService,
    text: &str,
    tx: &mpsc::Sender<Value>,
    forwarders: &mut Vec<JoinHandle<()>>,
) -> Vec<Value> {
    let task_id = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { task_id }) => task_id,
        Err(e) => return vec![error_frame(format!("Invalid message: {e}"))],
    };

    let Some(task_id) = task_id.filter(|id| !id.is_empty()) else {
        return vec![error_frame("task_id is required")];
    };
    let job_id = match task_id.parse::<JobId>() {
        Ok(job_id) => job_id,
        Err(e) => return vec![error_frame(e.to_string())],
    };

    match service.subscribe(job_id) {
        Subscription::Replayed(event) => vec![subscribed_frame(job_id), update_frame(&event)],
        Subscription::Live(mut updates) => {
            let tx = tx.clone();
            // The forwarder sends the ack so no update can overtake it.
            forwarders.push(tokio::spawn(async move {
                if tx.send(subscribed_frame(job_id)).await.is_err() {
                    return;
                }
                loop {
                    match updates.recv().await {
                        Ok(event) => {
                            if tx.send(update_frame(&event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Subscriber to {job_id} lagged, skipped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }));
            Vec::new()
        }
    }
}
