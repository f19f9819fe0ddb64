//! Match state machine: start, turn rotation, word submissions, reveals

use super::game::Match;
use super::session::Session;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::words;
use rand::seq::{IndexedRandom, SliceRandom};

impl Session {
    /// Leave the lobby: pick the word, the impostor and the turn order
    pub fn start_match(&mut self, by: &str) -> GameResult<()> {
        self.require_host(by, "start the match")?;
        self.require_status(SessionStatus::Waiting)?;

        let active: Vec<PlayerId> = self.active_players().map(|p| p.id.clone()).collect();
        if active.len() < self.config.min_players {
            return Err(GameError::InsufficientPlayers {
                required: self.config.min_players,
                actual: active.len(),
            });
        }

        let (secret_word, impostor_id, player_order) = {
            let mut rng = rand::rng();
            let word = words::pick_word(&self.settings, None, &mut rng);
            let impostor = active
                .choose(&mut rng)
                .cloned()
                .ok_or(GameError::InsufficientPlayers {
                    required: self.config.min_players,
                    actual: 0,
                })?;
            let mut order = active.clone();
            order.shuffle(&mut rng);
            (word, impostor, order)
        };

        tracing::info!(
            "Session {}: match started with {} players, impostor {}",
            self.code,
            player_order.len(),
            self.player_name(&impostor_id)
        );

        self.active_match = Some(Match::new(secret_word, impostor_id, player_order));
        self.status = SessionStatus::Playing;
        self.restart_turn_timer();
        self.announce_roles();
        Ok(())
    }

    /// Match-started message for one participant: their role, and the secret
    /// word unless they are the impostor or watching
    pub(crate) fn role_message(&self, player_id: &str) -> Option<ServerMessage> {
        let game = self.active_match.as_ref()?;
        let player = self.player(player_id)?;
        let (role, word) = if player.is_spectator {
            (Role::Spectator, None)
        } else if game.is_impostor(&player.id) {
            (Role::Impostor, None)
        } else {
            (Role::Player, Some(game.secret_word.clone()))
        };
        Some(ServerMessage::MatchStarted {
            role,
            word,
            session: self.view(),
        })
    }

    fn announce_roles(&self) {
        for player in &self.players {
            if let Some(message) = self.role_message(&player.id) {
                self.events.to_player(&player.id, message);
            }
        }
    }

    /// A word from the player on the clock
    pub fn submit_word(&mut self, by: &str, word: &str) -> GameResult<()> {
        self.require_member(by)?;
        self.require_status(SessionStatus::Playing)?;

        let word = word.trim();
        if word.is_empty() {
            return Err(GameError::InvalidPayload("word must not be empty".to_string()));
        }

        let game = self.require_match()?;
        if game.current_player().map(String::as_str) != Some(by) {
            return Err(GameError::NotYourTurn);
        }
        if game.is_duplicate(word) {
            return Err(GameError::DuplicateWord(word.to_string()));
        }

        let hits_secret = words::same_word(word, &game.secret_word);
        if hits_secret && game.is_impostor(by) {
            let message = format!(
                "The impostor {} named the secret word \"{}\"! Impostor +2",
                self.player_name(by),
                game.secret_word
            );
            self.finish_match(Outcome::ImpostorGuessedDuringPlay, message);
            return Ok(());
        }
        if hits_secret {
            self.reveal_word(by);
            return Ok(());
        }

        self.record_submission(by, word, false);
        Ok(())
    }

    /// Append a word for the current player and move the clock on. Shared by
    /// manual submissions and timeouts.
    pub(crate) fn record_submission(&mut self, player_id: &str, word: &str, skipped: bool) {
        let player_name = self.player_name(player_id);
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.cancel_turn_timer();

        let round = game.round;
        game.submissions.push(Submission {
            player_id: player_id.to_string(),
            player_name: player_name.clone(),
            word: word.to_string(),
            round,
            skipped,
        });
        let next = game.current_turn_index + 1;

        tracing::info!(
            "Session {}: {} submitted \"{}\" (round {})",
            self.code,
            player_name,
            word,
            round
        );

        self.settle_turn(next);
        self.publish_match_updated();
    }

    /// Put the next player on the clock, rolling the round over once everyone
    /// has a word in it. Voting opens when the round counter passes the limit.
    pub(crate) fn settle_turn(&mut self, next_index: usize) {
        let threshold = self.config.rounds_before_voting;
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.cancel_turn_timer();

        if game.round_complete() {
            game.round += 1;
            game.current_turn_index = 0;
            if game.round > threshold {
                self.enter_voting();
                return;
            }
        } else if !game.player_order.is_empty() {
            game.current_turn_index = next_index % game.player_order.len();
        }

        self.restart_turn_timer();
    }

    pub(crate) fn enter_voting(&mut self) {
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.cancel_turn_timer();
        game.votes.clear();
        game.vote_results = None;
        self.status = SessionStatus::Voting;
        tracing::info!(
            "Session {}: voting opened after round {}",
            self.code,
            game.completed_rounds()
        );
    }

    /// A non-impostor said the secret word: penalize and freeze the match
    fn reveal_word(&mut self, by: &str) {
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.cancel_turn_timer();
        game.revealed_by = Some(by.to_string());
        let word = game.secret_word.clone();

        self.apply_score_event(super::score::ScoreEvent::WordRevealed(by.to_string()));
        self.status = SessionStatus::WordRevealed;

        let (name, new_score) = self
            .player(by)
            .map(|p| (p.name.clone(), p.score))
            .unwrap_or_default();
        tracing::info!(
            "Session {}: {} revealed the secret word, -1",
            self.code,
            name
        );

        self.events.to_all(ServerMessage::WordRevealed {
            player_id: by.to_string(),
            player_name: name,
            word,
            new_score,
            session: self.view(),
        });
    }

    /// Host resumes after a reveal with a fresh secret word
    pub fn continue_after_reveal(&mut self, by: &str) -> GameResult<()> {
        self.require_host(by, "continue after a reveal")?;
        self.require_status(SessionStatus::WordRevealed)?;

        let policy = self.config.reveal_policy;
        let threshold = self.config.rounds_before_voting;
        let new_word = {
            let game = self.require_match()?;
            words::pick_word(&self.settings, Some(&game.secret_word), &mut rand::rng())
        };

        let Some(game) = self.active_match.as_mut() else {
            return Err(GameError::WrongPhase {
                expected: SessionStatus::WordRevealed,
                actual: self.status,
            });
        };
        game.cancel_turn_timer();
        game.secret_word = new_word.clone();
        game.revealed_by = None;
        game.current_turn_index = 0;

        // Only advancing can cross into voting
        let to_voting = match policy {
            RevealPolicy::ReplayRound => {
                let round = game.round;
                game.submissions.retain(|s| s.round != round);
                false
            }
            RevealPolicy::AdvanceRound => {
                game.round += 1;
                game.votes.clear();
                game.vote_results = None;
                game.round > threshold
            }
        };

        let impostor_id = game.impostor_id.clone();
        let round = game.round;
        if to_voting {
            self.enter_voting();
        } else {
            self.status = SessionStatus::Playing;
            self.restart_turn_timer();
        }

        tracing::info!(
            "Session {}: continuing round {} with a new word ({:?})",
            self.code,
            round,
            policy
        );

        for player in self.active_players() {
            let is_impostor = player.id == impostor_id;
            self.events.to_player(
                &player.id,
                ServerMessage::NewWordAfterReveal {
                    word: (!is_impostor).then(|| new_word.clone()),
                    is_impostor,
                },
            );
        }
        self.publish_match_updated();
        Ok(())
    }
}
