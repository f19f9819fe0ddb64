use super::timer::TurnTimer;
use crate::protocol::MatchView;
use crate::types::*;
use crate::words;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One playthrough, from impostor assignment to a terminal outcome
#[derive(Debug)]
pub struct Match {
    pub secret_word: String,
    pub impostor_id: PlayerId,
    /// Active players frozen at match start (minus anyone who left)
    pub player_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub round: u32,
    pub submissions: Vec<Submission>,
    pub votes: HashMap<PlayerId, Ballot>,
    pub vote_results: Option<VoteTally>,
    /// rater -> (target -> points)
    pub ratings: HashMap<PlayerId, HashMap<PlayerId, i32>>,
    pub revealed_by: Option<PlayerId>,
    pub outcome: Option<Outcome>,
    pub turn_deadline: Option<DateTime<Utc>>,
    /// Bumped every time a turn timer is armed; a firing timer must match it
    pub turn_epoch: u64,
    pub(crate) timer: Option<TurnTimer>,
}

impl Match {
    pub fn new(secret_word: String, impostor_id: PlayerId, player_order: Vec<PlayerId>) -> Self {
        Self {
            secret_word,
            impostor_id,
            player_order,
            current_turn_index: 0,
            round: 1,
            submissions: Vec::new(),
            votes: HashMap::new(),
            vote_results: None,
            ratings: HashMap::new(),
            revealed_by: None,
            outcome: None,
            turn_deadline: None,
            turn_epoch: 0,
            timer: None,
        }
    }

    /// Player whose turn it is
    pub fn current_player(&self) -> Option<&PlayerId> {
        self.player_order.get(self.current_turn_index)
    }

    pub fn is_impostor(&self, player_id: &str) -> bool {
        self.impostor_id == player_id
    }

    pub fn round_submissions(&self) -> impl Iterator<Item = &Submission> {
        let round = self.round;
        self.submissions.iter().filter(move |s| s.round == round)
    }

    /// Case-insensitive duplicate check against this round's typed words
    pub fn is_duplicate(&self, word: &str) -> bool {
        self.round_submissions()
            .filter(|s| !s.skipped)
            .any(|s| words::same_word(&s.word, word))
    }

    /// Whether everyone in the order has a word in the current round
    pub fn round_complete(&self) -> bool {
        !self.player_order.is_empty()
            && self
                .player_order
                .iter()
                .all(|id| self.round_submissions().any(|s| &s.player_id == id))
    }

    /// Rounds fully played so far
    pub fn completed_rounds(&self) -> u32 {
        self.round.saturating_sub(1)
    }

    pub fn cancel_turn_timer(&mut self) {
        // Dropping the timer aborts its task
        self.timer = None;
        self.turn_deadline = None;
    }

    pub fn has_live_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn has_rated(&self, rater: &str, target: &str) -> bool {
        self.ratings
            .get(rater)
            .is_some_and(|given| given.contains_key(target))
    }

    /// Public projection; secrets only once the match has an outcome
    pub fn view(&self) -> MatchView {
        let ended = self.outcome.is_some();
        MatchView {
            round: self.round,
            player_order: self.player_order.clone(),
            current_turn_index: self.current_turn_index,
            current_player_id: self.current_player().cloned(),
            submissions: self.submissions.clone(),
            vote_count: self.votes.len(),
            total_voters: self.player_order.len(),
            vote_results: self.vote_results.clone(),
            revealed_by: self.revealed_by.clone(),
            turn_deadline: self.turn_deadline.map(|d| d.to_rfc3339()),
            outcome: self.outcome,
            impostor_id: ended.then(|| self.impostor_id.clone()),
            secret_word: ended.then(|| self.secret_word.clone()),
        }
    }
}
