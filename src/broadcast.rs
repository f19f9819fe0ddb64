use crate::protocol::ServerMessage;
use crate::types::PlayerId;
use tokio::sync::broadcast;

/// A message published on a session channel, optionally addressed to one player
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipient: Option<PlayerId>,
    pub message: ServerMessage,
}

impl Envelope {
    /// Whether a connection with this player id should forward the envelope
    pub fn is_for(&self, player_id: &str) -> bool {
        match &self.recipient {
            Some(recipient) => recipient == player_id,
            None => true,
        }
    }
}

/// Per-session multicast channel. Every connection joined to the session
/// subscribes once and filters by recipient.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Send to every connection of the session
    pub fn to_all(&self, message: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.tx.send(Envelope {
            recipient: None,
            message,
        });
    }

    /// Send to a single participant
    pub fn to_player(&self, player_id: &str, message: ServerMessage) {
        let _ = self.tx.send(Envelope {
            recipient: Some(player_id.to_string()),
            message,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
