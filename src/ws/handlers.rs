//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Payloads are validated here, then dispatched to host and player handler
//! modules. Authorization depends on the session, so it is checked by the
//! session itself.

use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{host, player};

pub const MAX_NAME_LENGTH: usize = 32;

/// Trimmed display name of 1 to 32 characters
pub fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidPayload("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(GameError::InvalidPayload(format!(
            "name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Successful actions answer through the session broadcast; only errors are
/// replied to directly.
pub(crate) fn reply_on_error(result: GameResult<()>) -> Option<ServerMessage> {
    result.err().map(ServerMessage::from)
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    player_id: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Lobby membership
        ClientMessage::CreateSession { name, settings } => {
            player::handle_create_session(state, player_id, name, settings).await
        }

        ClientMessage::JoinSession { name, code } => {
            player::handle_join_session(state, player_id, name, code).await
        }

        ClientMessage::LeaveSession { code } => {
            player::handle_leave_session(state, player_id, code).await
        }

        // Player actions
        ClientMessage::SubmitWord { code, word } => {
            player::handle_submit_word(state, player_id, code, word).await
        }

        ClientMessage::SubmitVote { code, target } => {
            player::handle_submit_vote(state, player_id, code, target).await
        }

        ClientMessage::SubmitGuess { code, guess } => {
            player::handle_submit_guess(state, player_id, code, guess).await
        }

        ClientMessage::RatePlayer {
            code,
            target_id,
            points,
        } => player::handle_rate_player(state, player_id, code, target_id, points).await,

        // Host commands
        ClientMessage::UpdateSettings { code, settings } => {
            host::handle_update_settings(state, player_id, code, settings).await
        }

        ClientMessage::StartMatch { code } => {
            host::handle_start_match(state, player_id, code).await
        }

        ClientMessage::ContinueAfterReveal { code } => {
            host::handle_continue_after_reveal(state, player_id, code).await
        }

        ClientMessage::EvaluateVotes { code } => {
            host::handle_evaluate_votes(state, player_id, code).await
        }

        ClientMessage::NextMatch { code } => host::handle_next_match(state, player_id, code).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionStatus;

    async fn create(state: &Arc<AppState>, player_id: &str) -> String {
        let result = handle_message(
            ClientMessage::CreateSession {
                name: "Alice".to_string(),
                settings: None,
            },
            player_id,
            state,
        )
        .await;

        match result {
            Some(ServerMessage::SessionCreated { code, .. }) => code,
            other => panic!("Expected SessionCreated, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Bob ").unwrap(), "Bob");
        assert!(matches!(
            validate_name("   "),
            Err(GameError::InvalidPayload(_))
        ));
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_session_reply() {
        let state = Arc::new(AppState::new());
        let code = create(&state, "host").await;

        assert_eq!(code.len(), 6);
        let view = state.snapshot(&code).await.unwrap();
        assert_eq!(view.host_id, "host");
        assert_eq!(view.players[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_join_is_case_insensitive() {
        let state = Arc::new(AppState::new());
        let code = create(&state, "host").await;

        let result = handle_message(
            ClientMessage::JoinSession {
                name: " Bob ".to_string(),
                code: code.to_lowercase(),
            },
            "guest",
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::SessionJoined {
                player_id,
                is_spectator,
                session,
            }) => {
                assert_eq!(player_id, "guest");
                assert!(!is_spectator);
                assert_eq!(session.players[1].name, "Bob");
            }
            other => panic!("Expected SessionJoined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_session_code() {
        let state = Arc::new(AppState::new());
        let result = handle_message(
            ClientMessage::StartMatch {
                code: "ZZZZZZ".to_string(),
            },
            "someone",
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "SESSION_NOT_FOUND"),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_requires_host() {
        let state = Arc::new(AppState::new());
        let code = create(&state, "host").await;
        for guest in ["g1", "g2"] {
            handle_message(
                ClientMessage::JoinSession {
                    name: guest.to_string(),
                    code: code.clone(),
                },
                guest,
                &state,
            )
            .await;
        }

        let result = handle_message(
            ClientMessage::StartMatch { code: code.clone() },
            "g1",
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NOT_HOST"),
            other => panic!("Expected Error, got {:?}", other),
        }

        let result = handle_message(
            ClientMessage::StartMatch { code: code.clone() },
            "host",
            &state,
        )
        .await;
        assert!(result.is_none());
        assert_eq!(
            state.snapshot(&code).await.unwrap().status,
            SessionStatus::Playing
        );
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let state = Arc::new(AppState::new());
        let result = handle_message(
            ClientMessage::CreateSession {
                name: "  ".to_string(),
                settings: None,
            },
            "host",
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_PAYLOAD"),
            other => panic!("Expected Error, got {:?}", other),
        }
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_session() {
        let state = Arc::new(AppState::new());
        let code = create(&state, "host").await;

        let result = handle_message(
            ClientMessage::LeaveSession { code: code.clone() },
            "host",
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::SessionLeft { code: left }) => assert_eq!(left, code),
            other => panic!("Expected SessionLeft, got {:?}", other),
        }
        assert_eq!(state.session_count().await, 0);
    }
}
