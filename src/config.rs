//! Process and game rule configuration loaded from the environment

use crate::types::{GameConfig, RevealPolicy};
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (PORT)
    pub port: u16,
    /// Rules applied to every session
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            game: GameConfig::from_env(),
        }
    }
}

impl GameConfig {
    /// Load rule overrides from environment variables, keeping defaults for
    /// anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            turn_seconds: env_or("TURN_SECONDS", defaults.turn_seconds),
            rounds_before_voting: env_or("ROUNDS_BEFORE_VOTING", defaults.rounds_before_voting),
            continue_round_ceiling: env_or(
                "CONTINUE_ROUND_CEILING",
                defaults.continue_round_ceiling,
            ),
            match_limit: env_or("MATCH_LIMIT", defaults.match_limit),
            max_players: env_or("MAX_PLAYERS", defaults.max_players),
            min_players: env_or("MIN_PLAYERS", defaults.min_players),
            reveal_policy: env_or::<RevealPolicy>("REVEAL_POLICY", defaults.reveal_policy),
        };
        config.sanitized()
    }

    /// Clamp values that would make a match unplayable
    pub fn sanitized(mut self) -> Self {
        if self.turn_seconds == 0 {
            tracing::warn!("TURN_SECONDS must be positive, using 60");
            self.turn_seconds = 60;
        }
        if self.min_players < 3 {
            tracing::warn!("MIN_PLAYERS below 3 makes no sense for this game, using 3");
            self.min_players = 3;
        }
        if self.max_players < self.min_players {
            tracing::warn!(
                "MAX_PLAYERS ({}) below MIN_PLAYERS ({}), raising it",
                self.max_players,
                self.min_players
            );
            self.max_players = self.min_players;
        }
        if self.rounds_before_voting == 0 {
            self.rounds_before_voting = 1;
        }
        if self.match_limit == 0 {
            self.match_limit = 1;
        }
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, trimmed);
            default
        }
    }
}
