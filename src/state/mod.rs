pub mod game;
mod roster;
pub mod score;
mod session;
mod timer;
mod turn;
pub mod vote;

pub use game::Match;
pub use roster::Departure;
pub use score::ScoreEvent;
pub use session::{Session, SessionHandle};
pub use vote::VoteDecision;

use crate::broadcast::Envelope;
use crate::error::{GameError, GameResult};
use crate::protocol::{ServerMessage, SessionView};
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Generate a random session code (6 characters, no look-alike glyphs)
fn generate_session_code() -> SessionCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively
pub fn normalize_code(code: &str) -> SessionCode {
    code.trim().to_uppercase()
}

/// A receiver on one session's channel
#[derive(Debug)]
pub struct Subscription {
    pub code: SessionCode,
    pub rx: broadcast::Receiver<Envelope>,
}

/// Shared application state: the session registry
#[derive(Clone)]
pub struct AppState {
    pub config: GameConfig,
    pub sessions: Arc<RwLock<HashMap<SessionCode, SessionHandle>>>,
    /// Which session each connection is in (at most one)
    pub memberships: Arc<RwLock<HashMap<PlayerId, SessionCode>>>,
    /// Receivers opened on create/join, waiting for the connection to pick them up
    pub pending_subscriptions: Arc<RwLock<HashMap<PlayerId, Subscription>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(HashMap::new())),
            pending_subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_session(&self, code: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(&normalize_code(code)).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Session code the player currently belongs to
    pub async fn session_of(&self, player_id: &str) -> Option<SessionCode> {
        self.memberships.read().await.get(player_id).cloned()
    }

    /// Receiver for everything published in a session
    pub async fn subscribe(&self, code: &str) -> Option<broadcast::Receiver<Envelope>> {
        let handle = self.get_session(code).await?;
        let session = handle.lock().await;
        Some(session.events().subscribe())
    }

    /// Receiver opened for the player when they created or joined a session.
    /// It has buffered everything published since then.
    pub async fn take_subscription(&self, player_id: &str) -> Option<Subscription> {
        self.pending_subscriptions.write().await.remove(player_id)
    }

    /// Private messages that bring a connection back in line after it missed
    /// broadcasts: a snapshot, plus its role and word while a match runs
    pub async fn catch_up(&self, code: &str, player_id: &str) -> Vec<ServerMessage> {
        let Some(handle) = self.get_session(code).await else {
            return Vec::new();
        };
        let session = handle.lock().await;
        if session.player(player_id).is_none() {
            return Vec::new();
        }

        let mut messages = vec![ServerMessage::SessionUpdated {
            session: session.view(),
        }];
        if matches!(
            session.status,
            SessionStatus::Playing
                | SessionStatus::Voting
                | SessionStatus::WordRevealed
                | SessionStatus::ImposterGuess
        ) {
            messages.extend(session.role_message(player_id));
        }
        messages
    }

    /// Public snapshot of a session
    pub async fn snapshot(&self, code: &str) -> Option<SessionView> {
        let handle = self.get_session(code).await?;
        let session = handle.lock().await;
        Some(session.view())
    }

    async fn ensure_unattached(&self, player_id: &str) -> GameResult<()> {
        match self.session_of(player_id).await {
            Some(code) => Err(GameError::not_allowed(format!(
                "already in session {}",
                code
            ))),
            None => Ok(()),
        }
    }

    /// Open a new session with the creator as host
    pub async fn create_session(
        &self,
        player_id: PlayerId,
        name: String,
        settings: Option<Settings>,
    ) -> GameResult<(SessionCode, SessionView)> {
        self.ensure_unattached(&player_id).await?;

        let (handle, rx) = {
            let mut sessions = self.sessions.write().await;
            // Generate a unique code (check for collisions)
            let code = loop {
                let code = generate_session_code();
                if !sessions.contains_key(&code) {
                    break code;
                }
            };
            let handle = Session::create(
                code.clone(),
                player_id.clone(),
                name.clone(),
                settings.unwrap_or_default(),
                self.config.clone(),
            );
            // Nobody else can reach the session before it is registered
            let rx = handle.lock().await.events().subscribe();
            sessions.insert(code, handle.clone());
            (handle, rx)
        };

        let (code, view) = {
            let session = handle.lock().await;
            (session.code.clone(), session.view())
        };
        self.park_subscription(&player_id, &code, rx).await;
        self.memberships
            .write()
            .await
            .insert(player_id, code.clone());

        tracing::info!("Session {} created by {}", code, name);
        Ok((code, view))
    }

    /// Add a participant; returns whether they joined as a spectator
    pub async fn join_session(
        &self,
        player_id: PlayerId,
        name: String,
        code: &str,
    ) -> GameResult<(bool, SessionView)> {
        self.ensure_unattached(&player_id).await?;
        let handle = self
            .get_session(code)
            .await
            .ok_or(GameError::SessionNotFound)?;

        let (code, is_spectator, view, rx) = {
            let mut session = handle.lock().await;
            if session.is_closed() {
                return Err(GameError::SessionNotFound);
            }
            // Subscribe before joining so no private message can slip past
            let rx = session.events().subscribe();
            let is_spectator = session.add_player(player_id.clone(), name)?;
            (session.code.clone(), is_spectator, session.view(), rx)
        };
        self.park_subscription(&player_id, &code, rx).await;
        self.memberships.write().await.insert(player_id, code);
        Ok((is_spectator, view))
    }

    async fn park_subscription(
        &self,
        player_id: &str,
        code: &str,
        rx: broadcast::Receiver<Envelope>,
    ) {
        self.pending_subscriptions.write().await.insert(
            player_id.to_string(),
            Subscription {
                code: code.to_string(),
                rx,
            },
        );
    }

    /// Remove a participant and destroy the session once it is empty
    pub async fn remove_participant(&self, code: &str, player_id: &str) -> GameResult<Departure> {
        let handle = self
            .get_session(code)
            .await
            .ok_or(GameError::SessionNotFound)?;

        // The session lock is released before the registry is touched
        let departure = {
            let mut session = handle.lock().await;
            session.remove_player(player_id)?
        };
        self.memberships.write().await.remove(player_id);
        self.pending_subscriptions.write().await.remove(player_id);

        if departure.emptied {
            let mut sessions = self.sessions.write().await;
            let code = normalize_code(code);
            if sessions
                .get(&code)
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                sessions.remove(&code);
                tracing::info!("Session {} destroyed", code);
            }
        }
        Ok(departure)
    }

    /// Connection went away: leave whatever session it was in
    pub async fn disconnect(&self, player_id: &str) {
        let Some(code) = self.session_of(player_id).await else {
            return;
        };
        match self.remove_participant(&code, player_id).await {
            Ok(departure) => {
                tracing::info!("{} disconnected from {}", departure.player.name, code)
            }
            Err(e) => {
                tracing::warn!("Disconnect of {} from {} failed: {}", player_id, code, e);
                self.memberships.write().await.remove(player_id);
                self.pending_subscriptions.write().await.remove(player_id);
            }
        }
    }

    /// Run one action against a session under its lock. A rejected action
    /// re-sends the unchanged state to the actor.
    pub async fn with_session<T>(
        &self,
        code: &str,
        player_id: &str,
        action: impl FnOnce(&mut Session) -> GameResult<T>,
    ) -> GameResult<T> {
        let handle = self
            .get_session(code)
            .await
            .ok_or(GameError::SessionNotFound)?;
        let mut session = handle.lock().await;
        if session.is_closed() {
            return Err(GameError::SessionNotFound);
        }

        let result = action(&mut *session);
        if let Err(e) = &result {
            tracing::debug!(
                "Session {}: action by {} rejected: {}",
                session.code,
                player_id,
                e
            );
            if session.player(player_id).is_some() {
                session.resync(player_id);
            }
        }
        result
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
