//! Live dashboard feed over a websocket.
//!
//! On connect the actor joins its topic set; matching broadcast payloads are
//! forwarded as-is. Delivery is best-effort: a dropped socket or a lagging
//! receiver loses messages, the notifications table does not.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::auth::Actor;
use crate::shared::enums::Role;
use crate::shared::models::User;
use crate::shared::state::AppState;

/// Topics an actor subscribes to: personal inbox always, plus the
/// role-appropriate dashboard group.
pub fn actor_topics(user: &User) -> Vec<String> {
    let mut topics = vec![format!("user_{}", user.id)];
    match user.role {
        Role::Jefe => topics.push("stats_jefes".to_string()),
        Role::Supervisor => {
            if let Some(office_id) = user.office_id {
                topics.push(format!("stats_office_{office_id}"));
            }
        }
        Role::Tecnico => topics.push(format!("stats_tech_{}", user.id)),
        Role::Unassigned => {}
    }
    topics
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stats_socket(socket, state, actor.0))
}

async fn handle_stats_socket(socket: WebSocket, state: Arc<AppState>, user: User) {
    let topics = actor_topics(&user);
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.broadcaster.subscribe();
    let (out_tx, mut out_rx) = tokio::sync::mpsc::channel::<Message>(8);

    let ack = serde_json::json!({
        "type": "connected",
        "groups": topics,
    });
    if sender.send(Message::Text(ack.to_string())).await.is_err() {
        return;
    }

    // single writer: forwards matching broadcast payloads and queued replies
    let forward_topics = topics.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                broadcast = rx.recv() => match broadcast {
                    Ok(msg) => {
                        if !forward_topics.contains(&msg.topic) {
                            continue;
                        }
                        if sender
                            .send(Message::Text(msg.payload.to_string()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("stats socket lagged, dropped {skipped} messages");
                    }
                    Err(RecvError::Closed) => break,
                },
                reply = out_rx.recv() => match reply {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    while let Some(incoming) = receiver.next().await {
        match incoming {
            Ok(Message::Text(text)) => {
                let parsed: Option<serde_json::Value> = serde_json::from_str(&text).ok();
                let kind = parsed
                    .as_ref()
                    .and_then(|v| v.get("type"))
                    .and_then(|t| t.as_str());
                if kind == Some("ping") {
                    let timestamp = parsed
                        .as_ref()
                        .and_then(|v| v.get("timestamp"))
                        .cloned()
                        .unwrap_or(serde_json::Value::Null);
                    let pong =
                        serde_json::json!({ "type": "pong", "timestamp": timestamp });
                    if out_tx.send(Message::Text(pong.to_string())).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("stats socket error for {}: {e}", user.username);
                break;
            }
        }
    }

    send_task.abort();
    log::debug!("stats socket closed for {}", user.username);
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/stats", get(ws_handler))
}
