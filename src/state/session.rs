use super::game::Match;
use crate::broadcast::EventBus;
use crate::error::{GameError, GameResult};
use crate::protocol::{ServerMessage, SessionView};
use crate::types::*;
use crate::words;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Shared, serialized access to one session. Every state transition for a
/// session happens while holding this lock.
pub type SessionHandle = Arc<Mutex<Session>>;

/// One lobby of connected players sharing a code, spanning several matches
#[derive(Debug)]
pub struct Session {
    pub code: SessionCode,
    /// Insertion order is display order
    pub players: Vec<Player>,
    pub host_id: PlayerId,
    pub status: SessionStatus,
    pub settings: Settings,
    /// Completed matches in the current series
    pub match_count: u32,
    /// Present iff status != Waiting
    pub active_match: Option<Match>,
    pub(crate) config: GameConfig,
    pub(crate) events: EventBus,
    /// Set once the roster empties; the registry drops the session afterwards
    pub(crate) closed: bool,
    this: Weak<Mutex<Session>>,
}

/// Store the built-in spelling of the category, or the default for unknown names
fn resolve_category(mut settings: Settings) -> Settings {
    settings.category = words::known_category(&settings.category)
        .unwrap_or(words::DEFAULT_CATEGORY)
        .to_string();
    settings
}

impl Session {
    /// Create a session with its host and return the shared handle
    pub fn create(
        code: SessionCode,
        host_id: PlayerId,
        host_name: String,
        settings: Settings,
        config: GameConfig,
    ) -> SessionHandle {
        Arc::new_cyclic(|this| {
            Mutex::new(Session {
                code,
                players: vec![Player::new(host_id.clone(), host_name, true, false)],
                host_id,
                status: SessionStatus::Waiting,
                settings: resolve_category(settings),
                match_count: 0,
                active_match: None,
                config,
                events: EventBus::default(),
                closed: false,
                this: this.clone(),
            })
        })
    }

    pub(crate) fn handle_ref(&self) -> Weak<Mutex<Session>> {
        self.this.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn player_name(&self, player_id: &str) -> String {
        self.player(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Non-spectator players in roster order
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_spectator)
    }

    pub fn is_final(&self) -> bool {
        self.match_count >= self.config.match_limit
    }

    pub(crate) fn require_member(&self, player_id: &str) -> GameResult<&Player> {
        self.player(player_id).ok_or(GameError::NotInSession)
    }

    pub(crate) fn require_host(&self, player_id: &str, action: &'static str) -> GameResult<()> {
        self.require_member(player_id)?;
        if self.host_id != player_id {
            return Err(GameError::NotHost(action));
        }
        Ok(())
    }

    pub(crate) fn require_status(&self, expected: SessionStatus) -> GameResult<()> {
        if self.status != expected {
            return Err(GameError::WrongPhase {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    pub(crate) fn require_match(&self) -> GameResult<&Match> {
        self.active_match.as_ref().ok_or(GameError::WrongPhase {
            expected: SessionStatus::Playing,
            actual: self.status,
        })
    }

    /// Public snapshot of the session
    pub fn view(&self) -> SessionView {
        SessionView {
            code: self.code.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            settings: self.settings.clone(),
            players: self.players.clone(),
            match_count: self.match_count,
            match_limit: self.config.match_limit,
            is_final: self.is_final(),
            current_match: self.active_match.as_ref().map(Match::view),
            server_now: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub(crate) fn publish_session_updated(&self) {
        self.events.to_all(ServerMessage::SessionUpdated {
            session: self.view(),
        });
    }

    pub(crate) fn publish_match_updated(&self) {
        self.events.to_all(ServerMessage::MatchUpdated {
            session: self.view(),
        });
    }

    /// Re-send the authoritative state to one participant (after a rejected action)
    pub fn resync(&self, player_id: &str) {
        self.events.to_player(
            player_id,
            ServerMessage::SessionUpdated {
                session: self.view(),
            },
        );
    }

    /// Replace the word settings (host only, between matches)
    pub fn update_settings(&mut self, by: &str, settings: Settings) -> GameResult<()> {
        self.require_host(by, "change settings")?;
        self.require_status(SessionStatus::Waiting)?;

        if words::known_category(&settings.category).is_none() {
            tracing::debug!(
                "Session {}: unknown category {:?}, using {}",
                self.code,
                settings.category,
                words::DEFAULT_CATEGORY
            );
        }
        let settings = resolve_category(settings);

        if settings.word_mode == WordMode::Custom
            && settings.custom_words.iter().all(|w| w.trim().is_empty())
        {
            tracing::debug!(
                "Session {}: custom mode without words, category {} will be used",
                self.code,
                settings.category
            );
        }

        self.settings = settings;
        tracing::info!("Session {}: settings updated", self.code);
        self.events.to_all(ServerMessage::SettingsUpdated {
            session: self.view(),
        });
        Ok(())
    }
}
