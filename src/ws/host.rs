//! Host command handlers
//!
//! The session rejects these with NOT_HOST unless the sender holds the host role.

use super::handlers::reply_on_error;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::Settings;
use std::sync::Arc;

pub async fn handle_update_settings(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
    settings: Settings,
) -> Option<ServerMessage> {
    tracing::info!(
        "Settings update for {}: {:?} / {}",
        code,
        settings.word_mode,
        settings.category
    );
    let result = state
        .with_session(&code, player_id, |s| s.update_settings(player_id, settings))
        .await;
    reply_on_error(result)
}

pub async fn handle_start_match(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
) -> Option<ServerMessage> {
    tracing::info!("Start match requested for {}", code);
    let result = state
        .with_session(&code, player_id, |s| s.start_match(player_id))
        .await;
    reply_on_error(result)
}

pub async fn handle_continue_after_reveal(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.continue_after_reveal(player_id))
        .await;
    reply_on_error(result)
}

pub async fn handle_evaluate_votes(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.evaluate_votes(player_id))
        .await;
    reply_on_error(result)
}

pub async fn handle_next_match(
    state: &Arc<AppState>,
    player_id: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = state
        .with_session(&code, player_id, |s| s.next_match(player_id))
        .await;
    reply_on_error(result)
}
