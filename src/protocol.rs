use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateSession {
        name: String,
        #[serde(default)]
        settings: Option<Settings>,
    },
    JoinSession {
        name: String,
        code: SessionCode,
    },
    // Host-only messages
    UpdateSettings {
        code: SessionCode,
        settings: Settings,
    },
    StartMatch {
        code: SessionCode,
    },
    ContinueAfterReveal {
        code: SessionCode,
    },
    EvaluateVotes {
        code: SessionCode,
    },
    NextMatch {
        code: SessionCode,
    },
    // Player messages
    SubmitWord {
        code: SessionCode,
        word: String,
    },
    /// Target player id, or "CONTINUE" to keep playing
    SubmitVote {
        code: SessionCode,
        target: String,
    },
    /// Impostor's last chance after being caught
    SubmitGuess {
        code: SessionCode,
        guess: String,
    },
    RatePlayer {
        code: SessionCode,
        target_id: PlayerId,
        points: i32,
    },
    LeaveSession {
        code: SessionCode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        player_id: PlayerId,
        server_now: String,
    },
    SessionCreated {
        code: SessionCode,
        player_id: PlayerId,
        session: SessionView,
    },
    SessionJoined {
        player_id: PlayerId,
        is_spectator: bool,
        session: SessionView,
    },
    /// Generic roster/score refresh
    SessionUpdated {
        session: SessionView,
    },
    SettingsUpdated {
        session: SessionView,
    },
    /// Sent privately to each participant; `word` is None for the impostor and spectators
    MatchStarted {
        role: Role,
        word: Option<String>,
        session: SessionView,
    },
    MatchUpdated {
        session: SessionView,
    },
    WordRevealed {
        player_id: PlayerId,
        player_name: String,
        word: String,
        new_score: i32,
        session: SessionView,
    },
    /// Sent privately after continue-after-reveal; None for the impostor
    NewWordAfterReveal {
        word: Option<String>,
        is_impostor: bool,
    },
    VoteCountUpdated {
        vote_count: usize,
        total_voters: usize,
    },
    VotingComplete {
        results: VoteTally,
        session: SessionView,
    },
    ImpostorRevealed {
        impostor_id: PlayerId,
        impostor_name: String,
        session: SessionView,
    },
    MatchEnded {
        outcome: Outcome,
        winner: Winner,
        message: String,
        is_final: bool,
        match_count: u32,
        impostor_id: PlayerId,
        secret_word: String,
        session: SessionView,
    },
    RatingUpdated {
        target_id: PlayerId,
        target_name: String,
        points: i32,
        new_total: i32,
    },
    HostChanged {
        host_id: PlayerId,
        host_name: String,
    },
    ParticipantLeft {
        player_id: PlayerId,
        player_name: String,
    },
    ParticipantJoinedSpectator {
        player_id: PlayerId,
        player_name: String,
    },
    ReturnedToWaiting {
        session: SessionView,
    },
    /// Reply to leave-session
    SessionLeft {
        code: SessionCode,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(e: crate::error::GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

/// Wire-facing snapshot of a session. Built explicitly from the session so
/// nothing internal (timers, ballots, the secret word mid-match) leaks out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub code: SessionCode,
    pub host_id: PlayerId,
    pub status: SessionStatus,
    pub settings: Settings,
    pub players: Vec<Player>,
    pub match_count: u32,
    pub match_limit: u32,
    pub is_final: bool,
    #[serde(rename = "match")]
    pub current_match: Option<MatchView>,
    pub server_now: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchView {
    pub round: u32,
    pub player_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub current_player_id: Option<PlayerId>,
    pub submissions: Vec<Submission>,
    /// Ballots cast so far in the current voting attempt
    pub vote_count: usize,
    pub total_voters: usize,
    pub vote_results: Option<VoteTally>,
    pub revealed_by: Option<PlayerId>,
    /// End of the current turn (RFC 3339), only while playing
    pub turn_deadline: Option<String>,
    pub outcome: Option<Outcome>,
    /// Only disclosed once the match has ended
    pub impostor_id: Option<PlayerId>,
    /// Only disclosed once the match has ended
    pub secret_word: Option<String>,
}
