//! Coin rewards for completed sessions and the sink that books them.

use crate::storage::{Database, RewardConfig};
use crate::timer::{CompletedSession, CompletionSink, SessionMode};

/// Coins earned by a completed session. Only whole minutes count.
pub fn coins_for(completed: &CompletedSession, config: &RewardConfig) -> u64 {
    let minutes = completed.total_seconds / 60;
    let rate = match completed.mode {
        SessionMode::Work => config.coins_per_work_minute,
        SessionMode::Rest => config.coins_per_rest_minute,
    };
    minutes.saturating_mul(rate)
}

/// Completion sink that writes each completion and its reward to the
/// history tables.
pub struct HistorySink {
    db: Database,
    rewards: RewardConfig,
    last_reward: Option<u64>,
}

impl HistorySink {
    pub fn new(db: Database, rewards: RewardConfig) -> Self {
        Self {
            db,
            rewards,
            last_reward: None,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Coins granted by the most recent completion this sink booked.
    pub fn last_reward(&self) -> Option<u64> {
        self.last_reward
    }
}

impl CompletionSink for HistorySink {
    fn on_session_completed(&mut self, completed: &CompletedSession) {
        let coins = coins_for(completed, &self.rewards);
        match self.db.record_completion(completed, coins) {
            Ok(true) => {
                tracing::info!(
                    session_id = %completed.session_id,
                    mode = completed.mode.as_str(),
                    coins,
                    "session completed"
                );
                self.last_reward = Some(coins);
            }
            Ok(false) => {
                tracing::debug!(session_id = %completed.session_id, "completion already recorded");
            }
            Err(e) => {
                tracing::warn!(session_id = %completed.session_id, error = %e, "failed to record completion");
            }
        }
    }
}
