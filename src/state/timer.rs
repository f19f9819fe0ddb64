//! Per-session turn timer
//!
//! A session owns at most one live timer, stored on its Match. Arming a new
//! timer drops the previous one, which aborts its task. A timer that already
//! woke up and is waiting for the session lock is not reachable by abort, so
//! the callback re-checks the epoch under the lock before doing anything.

use super::session::{Session, SessionHandle};
use crate::types::SessionStatus;
use chrono::Utc;
use std::sync::Weak;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

/// Handle to the single scheduled expiry of the current turn
#[derive(Debug)]
pub struct TurnTimer {
    pub epoch: u64,
    abort: AbortHandle,
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl Session {
    /// Cancel the running timer (if any) and start a fresh budget for the
    /// player now on the clock. The deadline is measured from now.
    pub(crate) fn restart_turn_timer(&mut self) {
        let budget = self.config.turn_duration();
        let this: Weak<Mutex<Session>> = self.handle_ref();
        let code = self.code.clone();

        let Some(game) = self.active_match.as_mut() else {
            return;
        };
        game.cancel_turn_timer();

        game.turn_epoch += 1;
        let epoch = game.turn_epoch;
        game.turn_deadline = chrono::Duration::from_std(budget)
            .ok()
            .map(|budget| Utc::now() + budget);

        let task = tokio::spawn(async move {
            tokio::time::sleep(budget).await;

            let Some(handle): Option<SessionHandle> = this.upgrade() else {
                return;
            };
            let mut session = handle.lock().await;
            session.expire_turn(epoch);
        });

        tracing::debug!(
            "Session {}: turn timer #{} armed ({}s)",
            code,
            epoch,
            budget.as_secs()
        );
        game.timer = Some(TurnTimer {
            epoch,
            abort: task.abort_handle(),
        });
    }

    /// Timer callback: skip the current player if this timer is still the
    /// one that belongs to the current turn. Anything else is a stale fire.
    pub(crate) fn expire_turn(&mut self, epoch: u64) {
        if self.closed || self.status != SessionStatus::Playing {
            tracing::debug!(
                "Session {}: ignoring timer #{} in {:?}",
                self.code,
                epoch,
                self.status
            );
            return;
        }

        let Some(game) = self.active_match.as_ref() else {
            return;
        };
        if game.turn_epoch != epoch || game.timer.as_ref().map(|t| t.epoch) != Some(epoch) {
            tracing::debug!(
                "Session {}: stale timer #{} (current #{})",
                self.code,
                epoch,
                game.turn_epoch
            );
            return;
        }
        let Some(player_id) = game.current_player().cloned() else {
            return;
        };

        tracing::info!(
            "Session {}: turn of {} timed out, skipping",
            self.code,
            player_id
        );
        self.record_submission(&player_id, crate::types::SKIPPED_WORD, true);
    }
}
