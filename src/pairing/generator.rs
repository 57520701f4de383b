//! Singles and doubles pairing algorithms
//!
//! Both algorithms sort players ascending by skill. Singles pairs neighbours;
//! doubles forms a single four-player group by crossing the extremes. Players
//! that do not fit (an odd singles player, doubles players beyond four) are
//! left out of the pass.

use crate::scoring::{CompatibilityScorer, MatchingCriteria};
use crate::types::{GameType, MatchSession, MatchingStatus, PlayerPairing, UserProfile};
use crate::utils::{current_timestamp, generate_id};
use std::sync::Arc;
use tracing::debug;

/// Generates pairings for a session from resolved player profiles
#[derive(Clone)]
pub struct PairingGenerator {
    scorer: Arc<dyn CompatibilityScorer>,
    criteria: MatchingCriteria,
}

impl PairingGenerator {
    pub fn new(scorer: Arc<dyn CompatibilityScorer>, criteria: MatchingCriteria) -> Self {
        Self { scorer, criteria }
    }

    pub fn criteria(&self) -> &MatchingCriteria {
        &self.criteria
    }

    /// Dispatch on the session's game type
    pub fn generate(&self, session: &MatchSession, players: Vec<UserProfile>) -> Vec<PlayerPairing> {
        let pairings = match session.game_type {
            GameType::Singles => self.generate_singles(session, players),
            GameType::Doubles => self.generate_doubles(session, players),
        };

        debug!(
            "Generated {} {} pairing(s) for session {} using '{}' scorer",
            pairings.len(),
            session.game_type,
            session.id,
            self.scorer.name()
        );

        pairings
    }

    /// Pair adjacent players by skill; a trailing odd player is dropped
    pub fn generate_singles(
        &self,
        session: &MatchSession,
        mut players: Vec<UserProfile>,
    ) -> Vec<PlayerPairing> {
        sort_by_skill(&mut players);

        players
            .chunks_exact(2)
            .map(|pair| {
                let score = self.scorer.score(&pair[0], &pair[1], &self.criteria);
                new_pairing(session, [&pair[0], &pair[1]], None, score)
            })
            .collect()
    }

    /// One balanced four-player group: (lowest, highest) and (second lowest, second highest)
    pub fn generate_doubles(
        &self,
        session: &MatchSession,
        mut players: Vec<UserProfile>,
    ) -> Vec<PlayerPairing> {
        if players.len() < 4 {
            return Vec::new();
        }

        sort_by_skill(&mut players);

        let n = players.len();
        let lowest = &players[0];
        let second_lowest = &players[1];
        let second_highest = &players[n - 2];
        let highest = &players[n - 1];

        let score = (self.scorer.score(lowest, highest, &self.criteria)
            + self
                .scorer
                .score(second_lowest, second_highest, &self.criteria))
            / 2.0;

        vec![new_pairing(
            session,
            [lowest, highest],
            Some([second_lowest, second_highest]),
            score,
        )]
    }
}

fn sort_by_skill(players: &mut [UserProfile]) {
    // Stable: equal skills keep admission order
    players.sort_by(|a, b| a.skill_level.total_cmp(&b.skill_level));
}

fn new_pairing(
    session: &MatchSession,
    first: [&UserProfile; 2],
    second: Option<[&UserProfile; 2]>,
    compatibility_score: f64,
) -> PlayerPairing {
    let now = current_timestamp();
    PlayerPairing {
        id: generate_id(),
        session_id: session.id,
        player1_id: first[0].id,
        player2_id: first[1].id,
        player3_id: second.map(|p| p[0].id),
        player4_id: second.map(|p| p[1].id),
        compatibility_score,
        status: MatchingStatus::Matched,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::WeightedCompatibilityScorer;
    use crate::types::NewMatchSession;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn create_test_generator() -> PairingGenerator {
        PairingGenerator::new(
            Arc::new(WeightedCompatibilityScorer::default()),
            MatchingCriteria::default(),
        )
    }

    fn create_test_session(game_type: GameType) -> MatchSession {
        let now = current_timestamp();
        MatchSession::new(
            Uuid::new_v4(),
            NewMatchSession {
                court_id: Uuid::new_v4(),
                start_time: now,
                end_time: now,
                game_type,
                skill_level: 4.0,
            },
            now,
        )
    }

    fn create_test_players(skills: &[f64]) -> Vec<UserProfile> {
        skills
            .iter()
            .enumerate()
            .map(|(i, skill)| UserProfile {
                id: Uuid::new_v4(),
                name: format!("player{}", i + 1),
                skill_level: *skill,
            })
            .collect()
    }

    #[test]
    fn test_singles_pairs_adjacent_skills() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Singles);
        let players = create_test_players(&[4.5, 3.0, 4.0, 3.5]);

        let pairings = generator.generate(&session, players.clone());

        assert_eq!(pairings.len(), 2);
        // Sorted: 3.0, 3.5, 4.0, 4.5
        assert_eq!(pairings[0].player1_id, players[1].id);
        assert_eq!(pairings[0].player2_id, players[3].id);
        assert_eq!(pairings[1].player1_id, players[2].id);
        assert_eq!(pairings[1].player2_id, players[0].id);

        for pairing in &pairings {
            assert_eq!(pairing.player_ids().len(), 2);
            assert_eq!(pairing.status, MatchingStatus::Matched);
            assert_eq!(pairing.session_id, session.id);
        }
    }

    #[test]
    fn test_singles_drops_odd_player() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Singles);
        let players = create_test_players(&[3.0, 5.0, 4.0]);

        let pairings = generator.generate(&session, players.clone());

        assert_eq!(pairings.len(), 1);
        // The strongest player is left over
        assert!(!pairings[0].includes(players[1].id));
    }

    #[test]
    fn test_singles_score_uses_scorer() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Singles);
        let players = create_test_players(&[4.0, 3.6]);

        let pairings = generator.generate(&session, players);
        assert!((pairings[0].compatibility_score - 0.59).abs() < 1e-9);
    }

    #[test]
    fn test_doubles_requires_four_players() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Doubles);

        for count in 0..4 {
            let skills: Vec<f64> = (0..count).map(|i| 3.0 + i as f64 * 0.5).collect();
            let pairings = generator.generate(&session, create_test_players(&skills));
            assert!(pairings.is_empty(), "{} players should not pair", count);
        }
    }

    #[test]
    fn test_doubles_crosses_extremes() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Doubles);
        let players = create_test_players(&[4.0, 3.0, 5.0, 3.5, 4.5]);

        let pairings = generator.generate(&session, players.clone());

        assert_eq!(pairings.len(), 1);
        let pairing = &pairings[0];
        // Sorted: 3.0, 3.5, 4.0, 4.5, 5.0
        assert_eq!(pairing.player1_id, players[1].id);
        assert_eq!(pairing.player2_id, players[2].id);
        assert_eq!(pairing.player3_id, Some(players[3].id));
        assert_eq!(pairing.player4_id, Some(players[4].id));
        // The middle player is not placed
        assert!(!pairing.includes(players[0].id));

        // Both axes are 1.0+ apart so each scores the floor
        assert!((pairing.compatibility_score - 0.53).abs() < 1e-9);
    }

    #[test]
    fn test_doubles_score_is_mean_of_axes() {
        let generator = create_test_generator();
        let session = create_test_session(GameType::Doubles);
        let players = create_test_players(&[4.0, 4.0, 4.0, 4.0]);

        let pairings = generator.generate(&session, players);
        assert!((pairings[0].compatibility_score - 0.83).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_singles_pairing_count(skills in proptest::collection::vec(1.0f64..7.0, 0..12)) {
            let generator = create_test_generator();
            let session = create_test_session(GameType::Singles);
            let pairings = generator.generate(&session, create_test_players(&skills));

            prop_assert_eq!(pairings.len(), skills.len() / 2);
            for pairing in &pairings {
                prop_assert_eq!(pairing.player_ids().len(), 2);
                prop_assert!((0.0..=1.0).contains(&pairing.compatibility_score));
            }
        }

        #[test]
        fn prop_doubles_pairing_count(skills in proptest::collection::vec(1.0f64..7.0, 0..12)) {
            let generator = create_test_generator();
            let session = create_test_session(GameType::Doubles);
            let pairings = generator.generate(&session, create_test_players(&skills));

            let expected = if skills.len() >= 4 { 1 } else { 0 };
            prop_assert_eq!(pairings.len(), expected);
            for pairing in &pairings {
                prop_assert_eq!(pairing.player_ids().len(), 4);
            }
        }
    }
}
