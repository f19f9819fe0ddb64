//! Ballots, tallies and the post-vote guess

use super::session::Session;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::words;

/// What a resolved voting attempt does to the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteDecision {
    /// CONTINUE outvoted every target; keep playing the same round
    Continue,
    /// No strict plurality on the first attempt; play one more round
    TieBreakRound,
    /// The impostor was singled out and gets a last guess
    ImpostorCaught,
    /// An honest player was singled out
    WrongAccusation(PlayerId),
    /// No strict plurality after the tie-break round
    Stalemate,
}

/// Apply the decision policy to a tally.
///
/// `round` is the match round counter; `completed_rounds` the rounds fully
/// played. A tie only earns an extra round on the first voting attempt.
pub fn decide(
    tally: &VoteTally,
    impostor_id: &str,
    round: u32,
    completed_rounds: u32,
    config: &GameConfig,
) -> VoteDecision {
    let max_target = tally.max_target_votes();

    if tally.continue_votes > max_target && round <= config.continue_round_ceiling {
        return VoteDecision::Continue;
    }

    match tally.plurality() {
        None if completed_rounds == config.rounds_before_voting => VoteDecision::TieBreakRound,
        None => VoteDecision::Stalemate,
        Some(target) if target == impostor_id => VoteDecision::ImpostorCaught,
        Some(target) => VoteDecision::WrongAccusation(target.clone()),
    }
}

impl Session {
    /// One ballot per active player per voting attempt
    pub fn submit_vote(&mut self, by: &str, target: &str) -> GameResult<()> {
        let voter = self.require_member(by)?;
        self.require_status(SessionStatus::Voting)?;
        if voter.is_spectator {
            return Err(GameError::not_allowed("spectators cannot vote"));
        }

        let game = self.require_match()?;
        if !game.player_order.iter().any(|id| id == by) {
            return Err(GameError::not_allowed("you are not playing this match"));
        }
        let ballot = Ballot::parse(target);
        if let Ballot::Accuse(accused) = &ballot {
            if !game.player_order.contains(accused) {
                return Err(GameError::not_allowed("unknown vote target"));
            }
        }
        if game.votes.contains_key(by) {
            return Err(GameError::not_allowed("you already voted"));
        }

        let Some(game) = self.active_match.as_mut() else {
            return Err(GameError::NotInSession);
        };
        game.votes.insert(by.to_string(), ballot);
        let (vote_count, total_voters) = (game.votes.len(), game.player_order.len());

        tracing::debug!(
            "Session {}: vote {}/{} received",
            self.code,
            vote_count,
            total_voters
        );

        if vote_count >= total_voters {
            self.resolve_votes();
        } else {
            self.events.to_all(ServerMessage::VoteCountUpdated {
                vote_count,
                total_voters,
            });
        }
        Ok(())
    }

    /// Host forces resolution with the ballots cast so far
    pub fn evaluate_votes(&mut self, by: &str) -> GameResult<()> {
        self.require_host(by, "evaluate the votes")?;
        self.require_status(SessionStatus::Voting)?;
        self.resolve_votes();
        Ok(())
    }

    /// Tally the current ballots and move the match on
    pub(crate) fn resolve_votes(&mut self) {
        if self.status != SessionStatus::Voting {
            return;
        }
        let Some(game) = self.active_match.as_mut() else {
            return;
        };

        let tally = VoteTally::from_ballots(game.votes.values());
        let decision = decide(
            &tally,
            &game.impostor_id,
            game.round,
            game.completed_rounds(),
            &self.config,
        );
        game.vote_results = Some(tally.clone());
        let impostor_id = game.impostor_id.clone();

        tracing::info!(
            "Session {}: votes resolved as {:?} ({} continue, {:?})",
            self.code,
            decision,
            tally.continue_votes,
            tally.targets
        );

        self.events.to_all(ServerMessage::VotingComplete {
            results: tally,
            session: self.view(),
        });

        match decision {
            VoteDecision::Continue | VoteDecision::TieBreakRound => self.resume_playing(),
            VoteDecision::ImpostorCaught => {
                self.status = SessionStatus::ImposterGuess;
                self.events.to_all(ServerMessage::ImpostorRevealed {
                    impostor_name: self.player_name(&impostor_id),
                    impostor_id,
                    session: self.view(),
                });
            }
            VoteDecision::WrongAccusation(accused) => {
                let message = format!(
                    "{} was not the impostor! {} wins. Impostor +1",
                    self.player_name(&accused),
                    self.player_name(&impostor_id)
                );
                self.finish_match(Outcome::WrongAccusation, message);
            }
            VoteDecision::Stalemate => {
                let message = format!(
                    "No decision after the tie-break round. {} escapes. Impostor +1",
                    self.player_name(&impostor_id)
                );
                self.finish_match(Outcome::Stalemate, message);
            }
        }
    }

    /// Back to the first player of the current round with a clean ballot box
    fn resume_playing(&mut self) {
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.votes.clear();
        game.current_turn_index = 0;
        self.status = SessionStatus::Playing;
        self.restart_turn_timer();
        self.publish_match_updated();
    }

    /// The caught impostor names the word
    pub fn submit_guess(&mut self, by: &str, guess: &str) -> GameResult<()> {
        self.require_member(by)?;
        self.require_status(SessionStatus::ImposterGuess)?;

        let game = self.require_match()?;
        if !game.is_impostor(by) {
            return Err(GameError::not_allowed("only the impostor can guess"));
        }
        let guess = guess.trim();
        if guess.is_empty() {
            return Err(GameError::InvalidPayload("guess must not be empty".to_string()));
        }

        let word = game.secret_word.clone();
        if words::same_word(guess, &word) {
            let message = format!(
                "The impostor guessed the word \"{}\"! Impostor +2, players +1",
                word
            );
            self.finish_match(Outcome::ImpostorGuessedAfterVote, message);
        } else {
            let message = format!(
                "The impostor guessed \"{}\" but the word was \"{}\". Players +2",
                guess, word
            );
            self.finish_match(Outcome::ImpostorGuessedWrong, message);
        }
        Ok(())
    }
}
