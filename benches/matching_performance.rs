//! Performance benchmarks for compatibility scoring and matching passes

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use court_matcher::config::MatchingSettings;
use court_matcher::events::EventPublisher;
use court_matcher::metrics::MetricsCollector;
use court_matcher::pairing::PairingGenerator;
use court_matcher::scoring::{CompatibilityScorer, MatchingCriteria, WeightedCompatibilityScorer};
use court_matcher::session::SessionManager;
use court_matcher::types::{
    GameType, MatchSession, MatchingFailed, NewMatchSession, PlayerJoinedSession, SessionMatched,
    SessionStatusChanged, UserProfile,
};
use court_matcher::utils::{current_timestamp, generate_id};
use court_matcher::{InMemorySessionStore, InMemoryUserDirectory};
use std::sync::Arc;

// Event publisher that discards everything
#[derive(Debug, Clone)]
struct BenchEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for BenchEventPublisher {
    async fn publish_player_joined(
        &self,
        _event: PlayerJoinedSession,
    ) -> court_matcher::error::Result<()> {
        Ok(())
    }

    async fn publish_session_matched(
        &self,
        _event: SessionMatched,
    ) -> court_matcher::error::Result<()> {
        Ok(())
    }

    async fn publish_matching_failed(
        &self,
        _event: MatchingFailed,
    ) -> court_matcher::error::Result<()> {
        Ok(())
    }

    async fn publish_status_changed(
        &self,
        _event: SessionStatusChanged,
    ) -> court_matcher::error::Result<()> {
        Ok(())
    }
}

fn create_profiles(count: usize) -> Vec<UserProfile> {
    (0..count)
        .map(|i| UserProfile {
            id: generate_id(),
            name: format!("player_{}", i),
            skill_level: 2.5 + (i % 9) as f64 * 0.25,
        })
        .collect()
}

fn create_session(game_type: GameType) -> MatchSession {
    let now = current_timestamp();
    MatchSession::new(
        generate_id(),
        NewMatchSession {
            court_id: generate_id(),
            start_time: now + Duration::days(1),
            end_time: now + Duration::days(1) + Duration::hours(1),
            game_type,
            skill_level: 3.5,
        },
        now,
    )
}

fn bench_compatibility_scoring(c: &mut Criterion) {
    let scorer = WeightedCompatibilityScorer::default();
    let criteria = MatchingCriteria::default();
    let profiles = create_profiles(2);

    c.bench_function("compatibility_score", |b| {
        b.iter(|| black_box(scorer.score(&profiles[0], &profiles[1], black_box(&criteria))))
    });
}

fn bench_pairing_generation(c: &mut Criterion) {
    let generator = PairingGenerator::new(
        Arc::new(WeightedCompatibilityScorer::default()),
        MatchingCriteria::default(),
    );

    let mut group = c.benchmark_group("pairing_generation");
    for count in [2usize, 16, 128] {
        let profiles = create_profiles(count);

        let singles = create_session(GameType::Singles);
        group.bench_with_input(BenchmarkId::new("singles", count), &profiles, |b, p| {
            b.iter(|| black_box(generator.generate(&singles, p.clone())))
        });

        let doubles = create_session(GameType::Doubles);
        group.bench_with_input(BenchmarkId::new("doubles", count), &profiles, |b, p| {
            b.iter(|| black_box(generator.generate(&doubles, p.clone())))
        });
    }
    group.finish();
}

fn bench_session_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("singles_create_join_match", |b| {
        b.iter(|| {
            rt.block_on(async {
                let profiles = create_profiles(2);
                let users: Vec<_> = profiles.iter().map(|p| p.id).collect();
                let directory = Arc::new(InMemoryUserDirectory::with_users(profiles));
                let (manager, _worker) = SessionManager::new(
                    Arc::new(InMemorySessionStore::new()),
                    directory,
                    Arc::new(BenchEventPublisher),
                    MatchingSettings::default(),
                    Arc::new(MetricsCollector::new().unwrap()),
                );

                let now = current_timestamp();
                let details = manager
                    .create_session(
                        users[0],
                        NewMatchSession {
                            court_id: generate_id(),
                            start_time: now + Duration::days(1),
                            end_time: now + Duration::days(1) + Duration::hours(1),
                            game_type: GameType::Singles,
                            skill_level: 4.0,
                        },
                    )
                    .await
                    .unwrap();
                manager
                    .join_session(details.session.id, users[1])
                    .await
                    .unwrap();

                black_box(manager.trigger_matching(details.session.id).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_compatibility_scoring,
    bench_pairing_generation,
    bench_session_lifecycle
);
criterion_main!(benches);
