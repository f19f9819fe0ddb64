//! Player message handlers
//!
//! Session membership plus the in-match actions every participant can take.

use super::handlers::{reply_on_error, validate_name};
use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::{normalize_code, AppState};
use crate::types::Settings;
use std::sync::Arc;

pub async fn handle_create_session(
    state: &Arc<AppState>,
    player_id: &str,
    name: String,
    settings: Option<Settings>,
) -> Option<ServerMessage> {
    let name = match validate_name(&name) {
        Ok(name) => name,
        Err(e) => return Some(e.into()),
    };

    match state
        .create_session(player_id.to_string(), name, settings)
        .await
    {
        Ok((code, session)) => Some(ServerMessage::SessionCreated {
            code,
            player_id: player_id.to_string(),
            session,
        }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_join_session(
    state: &Arc<AppState>,
    player_id: &str,
    name: String,
    code: String,
) -> Option<ServerMessage> {
    let name = match validate_name(&name) {
        Ok(name) => name,
        Err(e) => return Some(e.into()),
    };
    tracing::info!("Join request for {} from {}", code, name);

    match state
        .join_session(player_id.to_string(), name, &code)
        .await
    {
        Ok((is_spectator, session)) => Some(ServerMessage::SessionJoined {
            player_id: player_id.to_string(),
            is_spectator,
            session,
        }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_leave_session(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
) -> Option<ServerMessage> {
    let code = normalize_code(&code);
    if state.session_of(player_id).await.as_deref() != Some(code.as_str()) {
        return Some(GameError::NotInSession.into());
    }

    match state.remove_participant(&code, player_id).await {
        Ok(_) => Some(ServerMessage::SessionLeft { code }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_submit_word(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
    word: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.submit_word(player_id, &word))
        .await;
    reply_on_error(result)
}

pub async fn handle_submit_vote(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
    target: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.submit_vote(player_id, &target))
        .await;
    reply_on_error(result)
}

pub async fn handle_submit_guess(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
    guess: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.submit_guess(player_id, &guess))
        .await;
    reply_on_error(result)
}

pub async fn handle_rate_player(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
    target_id: String,
    points: i32,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| {
            s.rate_player(player_id, &target_id, points)
        })
        .await;
    reply_on_error(result)
}
