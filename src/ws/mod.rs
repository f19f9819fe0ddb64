pub mod handlers;
pub mod host;
pub mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, Subscription};

pub const PROTOCOL_VERSION: &str = "1.0";

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Follow the connection's membership: take the receiver opened by
/// create/join, drop it after leaving.
async fn refresh_subscription(
    state: &AppState,
    player_id: &str,
    current: &mut Option<Subscription>,
) {
    let member_of = state.session_of(player_id).await;
    if current.as_ref().map(|s| &s.code) == member_of.as_ref() {
        return;
    }

    *current = match member_of {
        Some(code) => match state.take_subscription(player_id).await {
            Some(sub) if sub.code == code => Some(sub),
            _ => state
                .subscribe(&code)
                .await
                .map(|rx| Subscription { code, rx }),
        },
        None => None,
    };
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let player_id = ulid::Ulid::new().to_string();

    tracing::info!("WebSocket connected: {}", player_id);

    // Send welcome message
    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        player_id: player_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };

    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            // Handle session broadcasts
            event = async {
                match &mut subscription {
                    Some(sub) => Some(sub.rx.recv().await),
                    // Not in a session: wait forever
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    Some(Ok(envelope)) => {
                        if !envelope.is_for(&player_id) {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&envelope.message) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        tracing::warn!("{} lagged behind by {} events", player_id, skipped);
                        let Some(code) = subscription.as_ref().map(|s| s.code.clone()) else {
                            continue;
                        };
                        // Skipped events may have been private, resend the state
                        let mut closed = false;
                        for message in state.catch_up(&code, &player_id).await {
                            if let Ok(json) = serde_json::to_string(&message) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    closed = true;
                                    break;
                                }
                            }
                        }
                        if closed {
                            break;
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {
                        subscription = None;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", player_id, text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &player_id, &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if let Ok(json) = serde_json::to_string(&response) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }

                        refresh_subscription(&state, &player_id, &mut subscription).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", player_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(&player_id).await;
    tracing::info!("WebSocket connection closed: {}", player_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_follows_membership() {
        let state = Arc::new(AppState::new());
        let (code, _) = state
            .create_session("a".to_string(), "Alice".to_string(), None)
            .await
            .unwrap();
        for (id, name) in [("b", "Bob"), ("c", "Carol")] {
            state
                .join_session(id.to_string(), name.to_string(), &code)
                .await
                .unwrap();
        }
        // Start lands before Carol's socket refreshes its subscription
        state
            .with_session(&code, "a", |s| s.start_match("a"))
            .await
            .unwrap();

        let mut current = None;
        refresh_subscription(&state, "c", &mut current).await;
        let sub = current.as_mut().unwrap();
        assert_eq!(sub.code, code);

        let mut got_role = false;
        while let Ok(envelope) = sub.rx.try_recv() {
            if envelope.is_for("c") && matches!(envelope.message, ServerMessage::MatchStarted { .. })
            {
                got_role = true;
            }
        }
        assert!(got_role);

        state.remove_participant(&code, "c").await.unwrap();
        refresh_subscription(&state, "c", &mut current).await;
        assert!(current.is_none());
    }
}
