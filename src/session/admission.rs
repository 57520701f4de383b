//! Player admission into sessions
//!
//! A join computes the user's priority from how many other sessions they
//! could still join, then hands the row to the store which checks status,
//! capacity and duplicates in the same write as the insertion.

use crate::error::Result;
use crate::store::{AdmissionRule, SessionStore};
use crate::types::{MatchPlayer, SessionId, UserId};
use crate::utils::{current_timestamp, generate_id};
use std::sync::Arc;
use tracing::debug;

/// Priority for a user with `open_sessions` alternatives: fewer options, higher priority
pub fn calculate_priority(max_priority: u32, open_sessions: usize) -> u32 {
    let open = u32::try_from(open_sessions).unwrap_or(u32::MAX);
    max_priority.saturating_sub(open)
}

/// Admits players into sessions
#[derive(Clone)]
pub struct PlayerAdmission {
    store: Arc<dyn SessionStore>,
    max_priority: u32,
    rule: AdmissionRule,
}

impl PlayerAdmission {
    pub fn new(store: Arc<dyn SessionStore>, max_priority: u32, allow_join_after_matching: bool) -> Self {
        Self {
            store,
            max_priority,
            rule: AdmissionRule {
                require_pending: !allow_join_after_matching,
            },
        }
    }

    pub fn rule(&self) -> AdmissionRule {
        self.rule
    }

    /// Admit a user. Returns the stored player and the session's new player count.
    pub async fn admit(&self, session_id: SessionId, user_id: UserId) -> Result<(MatchPlayer, usize)> {
        let now = current_timestamp();

        let open_sessions = self
            .store
            .count_open_sessions_for(user_id, Some(session_id), now)
            .await?;
        let priority = calculate_priority(self.max_priority, open_sessions);

        let player = MatchPlayer {
            id: generate_id(),
            session_id,
            user_id,
            joined_at: now,
            preference_score: 0.0,
            priority,
        };

        let player_count = self.store.insert_player(player.clone(), self.rule).await?;

        debug!(
            "Admitted user {} into session {} - priority: {} ({} other open sessions), players: {}",
            user_id, session_id, priority, open_sessions, player_count
        );

        Ok((player, player_count))
    }
}
