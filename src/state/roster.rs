//! Membership changes: joins, departures, host failover

use super::session::Session;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

/// Result of removing a participant
#[derive(Debug, Clone)]
pub struct Departure {
    pub player: Player,
    /// The roster is now empty and the session must be destroyed
    pub emptied: bool,
    pub new_host: Option<PlayerId>,
}

impl Session {
    /// Append a participant. Anyone joining while a match runs becomes a spectator.
    pub fn add_player(&mut self, player_id: PlayerId, name: String) -> GameResult<bool> {
        if self.player(&player_id).is_some() {
            return Err(GameError::not_allowed("already in this session"));
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::SessionFull);
        }

        let is_spectator = self.status != SessionStatus::Waiting;
        self.players.push(Player::new(
            player_id.clone(),
            name.clone(),
            false,
            is_spectator,
        ));

        tracing::info!(
            "Session {}: {} joined{}",
            self.code,
            name,
            if is_spectator { " as spectator" } else { "" }
        );

        self.publish_session_updated();
        if is_spectator {
            self.events.to_all(ServerMessage::ParticipantJoinedSpectator {
                player_id,
                player_name: name,
            });
        }
        Ok(is_spectator)
    }

    /// Remove a participant, hand over the host role if needed and keep the
    /// running match consistent.
    pub fn remove_player(&mut self, player_id: &str) -> GameResult<Departure> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::NotInSession)?;
        let player = self.players.remove(index);

        if self.players.is_empty() {
            // Dropping the match cancels its timer
            self.active_match = None;
            self.closed = true;
            tracing::info!("Session {}: last participant left, closing", self.code);
            return Ok(Departure {
                player,
                emptied: true,
                new_host: None,
            });
        }

        let new_host = if player.id == self.host_id {
            Some(self.reassign_host())
        } else {
            None
        };

        self.repair_match(&player.id);

        tracing::info!("Session {}: {} left", self.code, player.name);
        self.publish_session_updated();
        self.events.to_all(ServerMessage::ParticipantLeft {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
        });

        Ok(Departure {
            player,
            emptied: false,
            new_host,
        })
    }

    /// First remaining non-spectator in roster order, else the first player
    fn reassign_host(&mut self) -> PlayerId {
        let index = self
            .players
            .iter()
            .position(|p| !p.is_spectator)
            .unwrap_or(0);

        for (i, p) in self.players.iter_mut().enumerate() {
            p.is_host = i == index;
        }
        let host = &self.players[index];
        self.host_id = host.id.clone();

        tracing::info!("Session {}: {} is the new host", self.code, host.name);
        self.events.to_all(ServerMessage::HostChanged {
            host_id: host.id.clone(),
            host_name: host.name.clone(),
        });
        self.host_id.clone()
    }

    /// Drop a departed player from the running match without leaving a turn
    /// index or ballot that points at them.
    fn repair_match(&mut self, player_id: &str) {
        let status = self.status;
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        if status == SessionStatus::Results {
            return;
        }

        let Some(position) = game.player_order.iter().position(|id| id == player_id) else {
            // Spectators are not part of the match
            return;
        };

        game.player_order.remove(position);
        game.votes.remove(player_id);
        game.votes
            .retain(|_, ballot| *ballot != Ballot::Accuse(player_id.to_string()));

        if game.is_impostor(player_id) {
            self.finish_match(
                Outcome::ImpostorLeft,
                "The impostor left the game. Nobody scores this match.".to_string(),
            );
            return;
        }
        if game.player_order.len() < 2 {
            self.finish_match(
                Outcome::Abandoned,
                "Not enough players left to continue.".to_string(),
            );
            return;
        }

        let held_turn = position == game.current_turn_index;
        if position < game.current_turn_index {
            game.current_turn_index -= 1;
        }

        match status {
            SessionStatus::Playing if held_turn => {
                // The next player slid into the departed player's slot
                let next = game.current_turn_index;
                self.settle_turn(next);
            }
            SessionStatus::Voting if game.votes.len() >= game.player_order.len() => {
                self.resolve_votes();
            }
            _ => game.current_turn_index %= game.player_order.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::session::tests::three_player_session;
    use super::*;

    #[tokio::test]
    async fn test_session_full() {
        let config = GameConfig {
            max_players: 3,
            ..GameConfig::default()
        };
        let handle = three_player_session(config);
        let mut session = handle.lock().await;

        let result = session.add_player("d".to_string(), "Dan".to_string());
        assert_eq!(result, Err(GameError::SessionFull));
        assert_eq!(session.players.len(), 3);
    }

    #[tokio::test]
    async fn test_join_mid_match_is_spectator() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.start_match("a").unwrap();

        let is_spectator = session
            .add_player("d".to_string(), "Dan".to_string())
            .unwrap();
        assert!(is_spectator);

        let game = session.active_match.as_ref().unwrap();
        assert!(!game.player_order.contains(&"d".to_string()));
        assert_ne!(game.impostor_id, "d");
    }

    #[tokio::test]
    async fn test_host_failover_prefers_non_spectator() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.start_match("a").unwrap();
        session.add_player("d".to_string(), "Dan".to_string()).unwrap();
        // Roster order becomes a, d (spectator), c, b
        session.players.swap(1, 3);

        let departure = session.remove_player("a").unwrap();
        assert_eq!(departure.new_host.as_deref(), Some("c"));
        assert_eq!(session.host_id, "c");
        assert_eq!(session.players.iter().filter(|p| p.is_host).count(), 1);
    }

    #[tokio::test]
    async fn test_host_failover_falls_back_to_spectator() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        for p in session.players.iter_mut().skip(1) {
            p.is_spectator = true;
        }

        session.remove_player("a").unwrap();
        assert_eq!(session.host_id, "b");
        assert!(session.player("b").unwrap().is_host);
    }

    #[tokio::test]
    async fn test_last_player_leaving_closes_session() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.start_match("a").unwrap();

        session.remove_player("a").unwrap();
        session.remove_player("b").unwrap();
        let departure = session.remove_player("c").unwrap();

        assert!(departure.emptied);
        assert!(session.is_closed());
        assert!(session.active_match.is_none());
    }

    #[tokio::test]
    async fn test_impostor_leaving_ends_match() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.start_match("a").unwrap();
        let impostor = session.active_match.as_ref().unwrap().impostor_id.clone();

        session.remove_player(&impostor).unwrap();

        assert_eq!(session.status, SessionStatus::Results);
        let game = session.active_match.as_ref().unwrap();
        assert_eq!(game.outcome, Some(Outcome::ImpostorLeft));
        assert!(!game.player_order.contains(&impostor));
        assert!(!game.has_live_timer());
        assert!(session.players.iter().all(|p| p.score == 0));
    }

    #[tokio::test]
    async fn test_departure_on_the_clock_passes_turn() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.add_player("d".to_string(), "Dan".to_string()).unwrap();
        session.start_match("a").unwrap();

        let (order, impostor) = {
            let game = session.active_match.as_mut().unwrap();
            // Put an honest player on the clock in the middle of the order
            let honest = game
                .player_order
                .iter()
                .position(|id| *id != game.impostor_id)
                .unwrap();
            game.player_order.swap(honest, 1);
            game.current_turn_index = 1;
            (game.player_order.clone(), game.impostor_id.clone())
        };
        let epoch = session.active_match.as_ref().unwrap().turn_epoch;

        session.remove_player(&order[1]).unwrap();

        let game = session.active_match.as_ref().unwrap();
        assert_eq!(session.status, SessionStatus::Playing);
        assert_eq!(game.player_order.len(), 3);
        assert_eq!(game.current_player(), Some(&order[2]));
        assert!(game.turn_epoch > epoch);
        assert!(game.has_live_timer());
        assert_eq!(game.impostor_id, impostor);
    }

    #[tokio::test]
    async fn test_departure_before_current_keeps_current_player() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.add_player("d".to_string(), "Dan".to_string()).unwrap();
        session.start_match("a").unwrap();

        let order = {
            let game = session.active_match.as_mut().unwrap();
            let honest = game
                .player_order
                .iter()
                .position(|id| *id != game.impostor_id)
                .unwrap();
            game.player_order.swap(honest, 0);
            game.current_turn_index = 2;
            game.player_order.clone()
        };

        session.remove_player(&order[0]).unwrap();

        let game = session.active_match.as_ref().unwrap();
        assert_eq!(game.current_turn_index, 1);
        assert_eq!(game.current_player(), Some(&order[2]));
    }

    #[tokio::test]
    async fn test_departure_completes_voting_quorum() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.add_player("d".to_string(), "Dan".to_string()).unwrap();
        session.start_match("a").unwrap();
        session.enter_voting();

        let (impostor, crew) = {
            let game = session.active_match.as_ref().unwrap();
            let crew: Vec<PlayerId> = game
                .player_order
                .iter()
                .filter(|id| **id != game.impostor_id)
                .cloned()
                .collect();
            (game.impostor_id.clone(), crew)
        };

        // Three of four ballots, one of them against the player who leaves
        session.submit_vote(&crew[0], &crew[1]).unwrap();
        session.submit_vote(&crew[1], &crew[0]).unwrap();
        session.submit_vote(&impostor, &crew[1]).unwrap();
        assert_eq!(session.status, SessionStatus::Voting);

        session.remove_player(&crew[2]).unwrap();

        // Quorum of the remaining three reached: crew[1] holds the plurality
        assert_eq!(session.status, SessionStatus::Results);
        assert_eq!(
            session.active_match.as_ref().unwrap().outcome,
            Some(Outcome::WrongAccusation)
        );
    }

    #[tokio::test]
    async fn test_too_few_players_abandons_match() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        session.start_match("a").unwrap();
        let honest: Vec<PlayerId> = {
            let game = session.active_match.as_ref().unwrap();
            game.player_order
                .iter()
                .filter(|id| **id != game.impostor_id)
                .cloned()
                .collect()
        };

        session.remove_player(&honest[0]).unwrap();
        assert_eq!(session.status, SessionStatus::Playing);
        session.remove_player(&honest[1]).unwrap();

        assert_eq!(session.status, SessionStatus::Results);
        assert_eq!(
            session.active_match.as_ref().unwrap().outcome,
            Some(Outcome::Abandoned)
        );
        assert_eq!(session.match_count, 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_player() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        assert!(matches!(
            session.remove_player("zzz"),
            Err(GameError::NotInSession)
        ));
    }
}
