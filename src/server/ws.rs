//! WebSocket upgrade wired to the Notification Fabric: the first message
//! must be an auth handshake, then the fabric's forwarded events are
//! relayed as JSON text frames until the session is closed.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditEventType, AuditStatus};
use crate::models::Topic;
use crate::notify::{self, AuthMessage, CloseCode, Session};

use super::AppState;

#[derive(Deserialize)]
struct WireAuthMessage {
    #[serde(rename = "type")]
    msg_type: String,
    token: String,
}

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((topic_kind, topic_id)): Path<(String, String)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, topic_kind, topic_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, topic_kind: String, topic_id: String) {
    let topic = match topic_kind.as_str() {
        "batch" => Topic::Batch(topic_id),
        "file" => Topic::File(topic_id),
        _ => {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let first_message = match tokio::time::timeout(HANDSHAKE_TIMEOUT, socket.recv()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str::<WireAuthMessage>(&text)
            .ok()
            .map(|m| AuthMessage { msg_type: m.msg_type, token: m.token }),
        _ => None,
    };

    let user_id = match notify::validate_handshake(first_message, state.auth.as_ref()).await {
        Ok(user_id) => {
            record_handshake(&state, &user_id, AuditStatus::Success);
            user_id
        }
        Err(close_code) => {
            record_handshake(&state, "unknown", AuditStatus::Failure);
            send_close(&mut socket, close_code).await;
            return;
        }
    };

    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        topic,
    };
    let idle_timeout = notify::idle_timeout(&state.session_config);
    let (snapshot, mut forwarder) = notify::register_session(state.notifier.clone(), session, idle_timeout).await;

    if let Some(snapshot) = snapshot {
        let Ok(payload) = serde_json::to_string(&snapshot) else {
            return;
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = forwarder.outbox.recv() => {
                match event {
                    Some(event) => {
                        let Ok(payload) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            close_code = forwarder.close.recv() => {
                if let Some(close_code) = close_code {
                    send_close(&mut socket, close_code).await;
                }
                break;
            }
            incoming = socket.recv() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    _ => {}
                }
            }
        }
    }
}

fn record_handshake(state: &AppState, actor: &str, status: AuditStatus) {
    let audit = state.audit.clone();
    let event = AuditEvent::new(AuditEventType::Authentication, actor, "ws_handshake", status, "-", serde_json::json!({}));
    tokio::spawn(async move {
        if let Err(err) = audit.record(event).await {
            warn!(error = %err, "failed to record audit event");
        }
    });
}

async fn send_close(socket: &mut WebSocket, close_code: CloseCode) {
    if let Err(err) = socket
        .send(Message::Text(format!(r#"{{"close":"{}"}}"#, close_code.as_str())))
        .await
    {
        warn!(error = %err, "failed to send close notice before dropping session");
    }
    let _ = socket.send(Message::Close(None)).await;
}
