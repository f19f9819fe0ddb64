use crate::types::SessionStatus;

/// Result type for session operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors a single action can produce. None of them leave the session in a
/// half-applied state; they are reported to the acting connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Session is full")]
    SessionFull,

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("It is not your turn")]
    NotYourTurn,

    #[error("The word \"{0}\" was already used this round")]
    DuplicateWord(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Action needs phase {expected:?}, session is in {actual:?}")]
    WrongPhase {
        expected: SessionStatus,
        actual: SessionStatus,
    },

    #[error("At least {required} active players are required (have {actual})")]
    InsufficientPlayers { required: usize, actual: usize },

    #[error("You are not part of this session")]
    NotInSession,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl GameError {
    /// Stable code sent to clients alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::SessionNotFound => "SESSION_NOT_FOUND",
            GameError::SessionFull => "SESSION_FULL",
            GameError::NotHost(_) => "NOT_HOST",
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::DuplicateWord(_) => "DUPLICATE_WORD",
            GameError::NotAllowed(_) => "NOT_ALLOWED",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::NotInSession => "NOT_IN_SESSION",
            GameError::InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }

    pub fn not_allowed(reason: impl Into<String>) -> Self {
        GameError::NotAllowed(reason.into())
    }
}
