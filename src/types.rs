use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type SessionCode = String;

/// Ballot text that votes to keep playing instead of accusing someone
pub const CONTINUE_BALLOT: &str = "CONTINUE";

/// Placeholder recorded when a turn runs out
pub const SKIPPED_WORD: &str = "[skipped]";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Waiting,
    Playing,
    Voting,
    WordRevealed,
    ImposterGuess,
    Results,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WordMode {
    #[default]
    Random,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub word_mode: WordMode,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub custom_words: Vec<String>,
}

fn default_category() -> String {
    crate::words::DEFAULT_CATEGORY.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            word_mode: WordMode::Random,
            category: default_category(),
            custom_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_spectator: bool,
    pub ready: bool,
    /// Points earned in the current match (reset by next-match)
    pub score: i32,
    /// Points across every match of the session, never reset
    pub total_points: i32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, is_host: bool, is_spectator: bool) -> Self {
        Self {
            id,
            name,
            is_host,
            is_spectator,
            ready: true,
            score: 0,
            total_points: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub player_id: PlayerId,
    pub player_name: String,
    pub word: String,
    pub round: u32,
    /// True for the placeholder recorded on timeout
    #[serde(default)]
    pub skipped: bool,
}

/// A single voting ballot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ballot {
    Continue,
    Accuse(PlayerId),
}

impl Ballot {
    pub fn parse(target: &str) -> Self {
        let target = target.trim();
        if target == CONTINUE_BALLOT {
            Ballot::Continue
        } else {
            Ballot::Accuse(target.to_string())
        }
    }
}

/// Counted ballots of one voting attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoteTally {
    pub targets: HashMap<PlayerId, u32>,
    #[serde(rename = "continue")]
    pub continue_votes: u32,
}

impl VoteTally {
    pub fn from_ballots<'a>(ballots: impl IntoIterator<Item = &'a Ballot>) -> Self {
        let mut tally = VoteTally::default();
        for ballot in ballots {
            match ballot {
                Ballot::Continue => tally.continue_votes += 1,
                Ballot::Accuse(target) => *tally.targets.entry(target.clone()).or_insert(0) += 1,
            }
        }
        tally
    }

    /// Highest per-target count (0 when nobody was accused)
    pub fn max_target_votes(&self) -> u32 {
        self.targets.values().copied().max().unwrap_or(0)
    }

    /// The single target holding the maximum, if exactly one does
    pub fn plurality(&self) -> Option<&PlayerId> {
        let max = self.max_target_votes();
        if max == 0 {
            return None;
        }
        let mut leaders = self.targets.iter().filter(|(_, count)| **count == max);
        match (leaders.next(), leaders.next()) {
            (Some((id, _)), None) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Impostor,
    Player,
    Spectator,
}

/// How a match came to an end
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    ImpostorGuessedDuringPlay,
    ImpostorGuessedAfterVote,
    ImpostorGuessedWrong,
    WrongAccusation,
    Stalemate,
    ImpostorLeft,
    Abandoned,
}

impl Outcome {
    pub fn winner(&self) -> Winner {
        match self {
            Outcome::ImpostorGuessedDuringPlay
            | Outcome::ImpostorGuessedAfterVote
            | Outcome::WrongAccusation
            | Outcome::Stalemate => Winner::Impostor,
            Outcome::ImpostorGuessedWrong | Outcome::ImpostorLeft => Winner::Players,
            Outcome::Abandoned => Winner::Nobody,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Impostor,
    Players,
    Nobody,
}

/// What continue-after-reveal does with the interrupted round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RevealPolicy {
    /// Wipe the round's words and replay it from the first player
    #[default]
    ReplayRound,
    /// Keep the words, move on to the next round and clear ballots
    AdvanceRound,
}

impl FromStr for RevealPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replay-round" | "replay" => Ok(RevealPolicy::ReplayRound),
            "advance-round" | "advance" => Ok(RevealPolicy::AdvanceRound),
            other => Err(format!("unknown reveal policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub turn_seconds: u64,
    /// Voting opens once the round counter exceeds this
    pub rounds_before_voting: u32,
    /// CONTINUE can only win while the round counter is at most this
    pub continue_round_ceiling: u32,
    pub match_limit: u32,
    pub max_players: usize,
    pub min_players: usize,
    pub reveal_policy: RevealPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_seconds: 60,
            rounds_before_voting: 2,
            continue_round_ceiling: 3,
            match_limit: 5,
            max_players: 10,
            min_players: 3,
            reveal_policy: RevealPolicy::ReplayRound,
        }
    }
}

impl GameConfig {
    pub fn turn_duration(&self) -> Duration {
        Duration::from_secs(self.turn_seconds)
    }
}
