//! `/events` WebSocket: question/answer events as JSON envelopes.
//!
//! Every text frame is `{"event": <name>, "data": <payload>}`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::AppState;

/// Events sent by the browser.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    AskQuestion { question: String },
    /// Frame pushed from the client. Logged, otherwise unused.
    Frame(serde_json::Value),
}

/// Events sent to the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Answer { answer: String },
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub async fn events(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max = state.max_message_size;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    log::info!("Event socket connected");
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    log::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json)).await {
                log::warn!("Failed to send event: {}", e);
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&text, &state, &tx),
            Ok(Message::Binary(_)) => log::warn!("Ignoring binary event frame"),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                log::warn!("Event socket error: {}", e);
                break;
            }
        }
    }

    // Pending answers keep their own sender clones; the send task ends once
    // the last of them is done.
    drop(tx);
    if let Err(e) = send_task.await {
        log::error!("Event send task failed: {}", e);
    }
    log::info!("Event socket closed");
}

fn dispatch(text: &str, state: &AppState, tx: &mpsc::UnboundedSender<ServerEvent>) {
    match ClientEvent::from_json(text) {
        Ok(ClientEvent::AskQuestion { question }) => {
            let responder = state.responder.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let answer = responder.answer(&question).await;
                let _ = tx.send(ServerEvent::Answer { answer });
            });
        }
        Ok(ClientEvent::Frame(data)) => {
            log::info!("Frame event received ({} bytes)", data.to_string().len());
        }
        Err(e) => log::warn!("Ignoring malformed event: {}", e),
    }
}
