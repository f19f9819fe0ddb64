use super::session::Session;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

/// Point-bearing events of a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreEvent {
    /// Impostor named the secret word on their own turn
    ImpostorGuessedDuringPlay,
    /// Impostor was caught and then named the word
    ImpostorGuessedAfterVote,
    /// Impostor was caught and guessed wrong
    ImpostorGuessedWrong,
    /// Stalemate or wrong accusation
    ImpostorUndetected,
    /// A player said the secret word out loud
    WordRevealed(PlayerId),
}

impl ScoreEvent {
    fn for_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::ImpostorGuessedDuringPlay => Some(ScoreEvent::ImpostorGuessedDuringPlay),
            Outcome::ImpostorGuessedAfterVote => Some(ScoreEvent::ImpostorGuessedAfterVote),
            Outcome::ImpostorGuessedWrong => Some(ScoreEvent::ImpostorGuessedWrong),
            Outcome::WrongAccusation | Outcome::Stalemate => Some(ScoreEvent::ImpostorUndetected),
            Outcome::ImpostorLeft | Outcome::Abandoned => None,
        }
    }
}

/// Point deltas for an event. `crew` are the active non-impostor players.
pub fn score_deltas(event: &ScoreEvent, impostor: &str, crew: &[PlayerId]) -> Vec<(PlayerId, i32)> {
    let everyone = |points: i32| crew.iter().map(move |id| (id.clone(), points));
    match event {
        ScoreEvent::ImpostorGuessedDuringPlay | ScoreEvent::ImpostorUndetected => {
            let points = if *event == ScoreEvent::ImpostorGuessedDuringPlay { 2 } else { 1 };
            vec![(impostor.to_string(), points)]
        }
        ScoreEvent::ImpostorGuessedAfterVote => std::iter::once((impostor.to_string(), 2))
            .chain(everyone(1))
            .collect(),
        ScoreEvent::ImpostorGuessedWrong => everyone(2).collect(),
        ScoreEvent::WordRevealed(player_id) => vec![(player_id.clone(), -1)],
    }
}

impl Session {
    /// Add an event's deltas to both the match score and the running total
    pub(crate) fn apply_score_event(&mut self, event: ScoreEvent) {
        let Some(game) = self.active_match.as_ref() else {
            return;
        };
        let impostor = game.impostor_id.clone();
        let crew: Vec<PlayerId> = self
            .active_players()
            .filter(|p| p.id != impostor)
            .map(|p| p.id.clone())
            .collect();

        for (player_id, delta) in score_deltas(&event, &impostor, &crew) {
            if let Some(player) = self.player_mut(&player_id) {
                player.score += delta;
                player.total_points += delta;
            }
        }
    }

    /// Terminal transition into results. Points for the outcome are applied
    /// once; a second call for the same match does nothing.
    pub(crate) fn finish_match(&mut self, outcome: Outcome, message: String) {
        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        if game.outcome.is_some() {
            tracing::warn!(
                "Session {}: match already ended, ignoring {:?}",
                self.code,
                outcome
            );
            return;
        }
        game.cancel_turn_timer();
        game.outcome = Some(outcome);
        let impostor_id = game.impostor_id.clone();
        let secret_word = game.secret_word.clone();

        if let Some(event) = ScoreEvent::for_outcome(outcome) {
            self.apply_score_event(event);
        }
        self.match_count += 1;
        self.status = SessionStatus::Results;

        tracing::info!(
            "Session {}: match {} ended ({:?}): {}",
            self.code,
            self.match_count,
            outcome,
            message
        );

        self.events.to_all(ServerMessage::MatchEnded {
            outcome,
            winner: outcome.winner(),
            message,
            is_final: self.is_final(),
            match_count: self.match_count,
            impostor_id,
            secret_word,
            session: self.view(),
        });
    }

    /// Post-match peer rating; adds straight to the target's total points
    pub fn rate_player(&mut self, by: &str, target_id: &str, points: i32) -> GameResult<()> {
        let rater = self.require_member(by)?;
        self.require_status(SessionStatus::Results)?;
        if rater.is_spectator {
            return Err(GameError::not_allowed("spectators cannot rate"));
        }

        let game = self.require_match()?;
        if game.is_impostor(by) {
            return Err(GameError::not_allowed("the impostor cannot rate"));
        }
        if by == target_id {
            return Err(GameError::not_allowed("you cannot rate yourself"));
        }
        if game.is_impostor(target_id) {
            return Err(GameError::not_allowed("the impostor is not rated"));
        }
        match self.player(target_id) {
            Some(target) if !target.is_spectator => {}
            _ => return Err(GameError::not_allowed("unknown rating target")),
        }
        if game.has_rated(by, target_id) {
            return Err(GameError::not_allowed("you already rated this player"));
        }

        if let Some(game) = self.active_match.as_mut() {
            game.ratings
                .entry(by.to_string())
                .or_default()
                .insert(target_id.to_string(), points);
        }

        let Some(target) = self.player_mut(target_id) else {
            return Err(GameError::not_allowed("unknown rating target"));
        };
        target.total_points = target.total_points.saturating_add(points);
        let (target_name, new_total) = (target.name.clone(), target.total_points);

        tracing::info!(
            "Session {}: {} gave {} points to {}",
            self.code,
            by,
            points,
            target_name
        );

        self.publish_session_updated();
        self.events.to_all(ServerMessage::RatingUpdated {
            target_id: target_id.to_string(),
            target_name,
            points,
            new_total,
        });
        Ok(())
    }

    /// Back to the lobby: clear the match, reset match scores, promote spectators
    pub fn next_match(&mut self, by: &str) -> GameResult<()> {
        self.require_host(by, "start the next match")?;
        self.require_status(SessionStatus::Results)?;

        // Dropping the match cancels any timer it still holds
        self.active_match = None;
        self.status = SessionStatus::Waiting;
        for player in self.players.iter_mut() {
            player.score = 0;
            player.is_spectator = false;
        }
        if self.is_final() {
            tracing::info!("Session {}: series finished, starting a new one", self.code);
            self.match_count = 0;
        }

        tracing::info!("Session {}: back to waiting", self.code);
        self.publish_session_updated();
        self.events.to_all(ServerMessage::ReturnedToWaiting {
            session: self.view(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::session::tests::three_player_session;
    use super::*;

    fn crew() -> Vec<PlayerId> {
        vec!["b".to_string(), "c".to_string()]
    }

    fn delta_of(deltas: &[(PlayerId, i32)], id: &str) -> i32 {
        deltas.iter().filter(|(p, _)| p == id).map(|(_, d)| d).sum()
    }

    #[test]
    fn test_score_deltas() {
        let d = score_deltas(&ScoreEvent::ImpostorGuessedDuringPlay, "a", &crew());
        assert_eq!(delta_of(&d, "a"), 2);
        assert_eq!(delta_of(&d, "b"), 0);

        let d = score_deltas(&ScoreEvent::ImpostorGuessedAfterVote, "a", &crew());
        assert_eq!(delta_of(&d, "a"), 2);
        assert_eq!(delta_of(&d, "b"), 1);
        assert_eq!(delta_of(&d, "c"), 1);

        let d = score_deltas(&ScoreEvent::ImpostorGuessedWrong, "a", &crew());
        assert_eq!(delta_of(&d, "a"), 0);
        assert_eq!(delta_of(&d, "b"), 2);

        let d = score_deltas(&ScoreEvent::ImpostorUndetected, "a", &crew());
        assert_eq!(d, vec![("a".to_string(), 1)]);

        let d = score_deltas(&ScoreEvent::WordRevealed("c".to_string()), "a", &crew());
        assert_eq!(d, vec![("c".to_string(), -1)]);
    }

    /// Start a match and end it by stalemate
    async fn finished_session() -> (crate::state::SessionHandle, PlayerId) {
        let handle = three_player_session(GameConfig::default());
        let impostor = {
            let mut session = handle.lock().await;
            session.start_match("a").unwrap();
            session.finish_match(Outcome::Stalemate, "stalemate".to_string());
            session.active_match.as_ref().unwrap().impostor_id.clone()
        };
        (handle, impostor)
    }

    #[tokio::test]
    async fn test_finish_match_is_idempotent() {
        let (handle, impostor) = finished_session().await;
        let mut session = handle.lock().await;

        session.finish_match(Outcome::Stalemate, "again".to_string());
        session.finish_match(Outcome::WrongAccusation, "and again".to_string());

        assert_eq!(session.match_count, 1);
        assert_eq!(session.player(&impostor).unwrap().score, 1);
        assert_eq!(session.player(&impostor).unwrap().total_points, 1);
        assert_eq!(
            session.active_match.as_ref().unwrap().outcome,
            Some(Outcome::Stalemate)
        );
        assert!(!session.active_match.as_ref().unwrap().has_live_timer());
    }

    #[tokio::test]
    async fn test_rating_rules() {
        let (handle, impostor) = finished_session().await;
        let mut session = handle.lock().await;
        let crew: Vec<PlayerId> = ["a", "b", "c"]
            .iter()
            .map(|s| s.to_string())
            .filter(|id| *id != impostor)
            .collect();

        assert!(matches!(
            session.rate_player(&impostor, &crew[0], 3),
            Err(GameError::NotAllowed(_))
        ));
        assert!(matches!(
            session.rate_player(&crew[0], &impostor, 3),
            Err(GameError::NotAllowed(_))
        ));
        assert!(matches!(
            session.rate_player(&crew[0], &crew[0], 3),
            Err(GameError::NotAllowed(_))
        ));

        session.rate_player(&crew[0], &crew[1], 3).unwrap();
        assert_eq!(session.player(&crew[1]).unwrap().total_points, 3);
        // Rating feeds totals only
        assert_eq!(session.player(&crew[1]).unwrap().score, 0);

        // Second rating of the same pair is rejected, not overwritten
        assert!(matches!(
            session.rate_player(&crew[0], &crew[1], 5),
            Err(GameError::NotAllowed(_))
        ));
        assert_eq!(session.player(&crew[1]).unwrap().total_points, 3);

        // The other direction is a different pair
        session.rate_player(&crew[1], &crew[0], 1).unwrap();
        assert_eq!(session.player(&crew[0]).unwrap().total_points, 1);
    }

    #[tokio::test]
    async fn test_rating_only_in_results() {
        let handle = three_player_session(GameConfig::default());
        let mut session = handle.lock().await;
        assert!(matches!(
            session.rate_player("a", "b", 1),
            Err(GameError::WrongPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_next_match_resets_scores_and_promotes() {
        let (handle, impostor) = finished_session().await;
        let mut session = handle.lock().await;
        session.add_player("d".to_string(), "Dan".to_string()).unwrap();
        assert!(session.player("d").unwrap().is_spectator);

        assert!(matches!(
            session.next_match("b"),
            Err(GameError::NotHost(_))
        ));
        session.next_match("a").unwrap();

        assert_eq!(session.status, SessionStatus::Waiting);
        assert!(session.active_match.is_none());
        assert!(!session.player("d").unwrap().is_spectator);
        assert_eq!(session.player(&impostor).unwrap().score, 0);
        assert_eq!(session.player(&impostor).unwrap().total_points, 1);
        assert_eq!(session.match_count, 1);
    }

    #[tokio::test]
    async fn test_final_match_starts_new_series() {
        let config = GameConfig {
            match_limit: 1,
            ..GameConfig::default()
        };
        let handle = three_player_session(config);
        let mut session = handle.lock().await;
        let mut rx = session.events().subscribe();
        session.start_match("a").unwrap();
        session.finish_match(Outcome::Stalemate, "done".to_string());

        let mut saw_final = false;
        while let Ok(envelope) = rx.try_recv() {
            if let ServerMessage::MatchEnded { is_final, .. } = envelope.message {
                saw_final = is_final;
            }
        }
        assert!(saw_final);

        session.next_match("a").unwrap();
        assert_eq!(session.match_count, 0);
    }
}
