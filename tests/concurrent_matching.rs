//! Concurrency tests for joins and matching passes
//!
//! Many joins and triggers race against the same sessions; capacity must
//! never be exceeded and each session must commit exactly one pairing set.

mod fixtures;

use court_matcher::error::MatchError;
use court_matcher::types::{GameType, MatchingStatus};
use court_matcher::MatchingOutcome;
use futures::future::join_all;
use std::time::Instant;

use fixtures::TestSystem;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_respect_capacity() {
    let mut system = TestSystem::new();
    let worker = system.start_worker();

    let organizer = system.add_user("organizer", 4.0);
    let session_id = system
        .create_session(organizer, GameType::Doubles, 1)
        .await
        .session
        .id;

    let skills: Vec<f64> = (0..40).map(|i| 3.0 + (i % 6) as f64 * 0.25).collect();
    let joiners = system.add_users(&skills);

    let start = Instant::now();
    let results = join_all(joiners.iter().map(|user_id| {
        let manager = system.manager.clone();
        let user_id = *user_id;
        tokio::spawn(async move { manager.join_session(session_id, user_id).await })
    }))
    .await;

    let mut admitted = 0;
    let mut rejected = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => admitted += 1,
            Err(MatchError::Conflict { .. }) => rejected += 1,
            Err(e) => panic!("unexpected join error: {}", e),
        }
    }
    println!(
        "40 concurrent joins processed in {:?}: {} admitted, {} rejected",
        start.elapsed(),
        admitted,
        rejected
    );

    // The organizer holds one of the four seats
    assert_eq!(admitted, 3);
    assert_eq!(rejected, 37);

    let details = system
        .wait_for_status(session_id, MatchingStatus::Matched)
        .await;
    assert_eq!(details.players.len(), 4);
    assert_eq!(details.pairings.len(), 1);
    assert_eq!(details.pairings[0].player_ids().len(), 4);
    assert_eq!(system.publisher.count("SessionMatched"), 1);

    drop(system);
    worker.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_commit_once() {
    let system = TestSystem::new();
    let users = system.add_users(&[3.0, 3.5, 4.0, 4.5]);

    let session_id = system
        .create_session(users[0], GameType::Doubles, 1)
        .await
        .session
        .id;
    for user_id in &users[1..] {
        system.manager.join_session(session_id, *user_id).await.unwrap();
    }

    let outcomes = join_all((0..16).map(|_| {
        let manager = system.manager.clone();
        tokio::spawn(async move { manager.trigger_matching(session_id).await })
    }))
    .await;

    let mut committed = 0;
    let mut already_matched = 0;
    for outcome in outcomes {
        match outcome.unwrap().unwrap() {
            MatchingOutcome::Committed { .. } => committed += 1,
            MatchingOutcome::AlreadyMatched => already_matched += 1,
            MatchingOutcome::NoPairings => panic!("four players always form a pairing"),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(already_matched, 15);

    let details = system.manager.get_session(session_id).await.unwrap();
    assert_eq!(details.pairings.len(), 1);
    assert_eq!(system.publisher.count("SessionMatched"), 1);

    let stats = system.manager.stats().await.unwrap();
    assert_eq!(stats.matching.committed, 1);
    assert_eq!(stats.matching.already_matched, 15);
    assert_eq!(stats.store.pairings, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_match_in_background() {
    let mut system = TestSystem::new();
    let worker = system.start_worker();

    let mut sessions = Vec::new();
    for day in 1..=20 {
        let pair = system.add_users(&[3.5, 4.0]);
        let session_id = system
            .create_session(pair[0], GameType::Singles, day)
            .await
            .session
            .id;
        sessions.push((session_id, pair[1]));
    }

    let joins = join_all(sessions.iter().map(|(session_id, user_id)| {
        let manager = system.manager.clone();
        let (session_id, user_id) = (*session_id, *user_id);
        tokio::spawn(async move { manager.join_session(session_id, user_id).await })
    }))
    .await;
    assert!(joins.into_iter().all(|r| r.unwrap().is_ok()));

    for (session_id, _) in &sessions {
        let details = system
            .wait_for_status(*session_id, MatchingStatus::Matched)
            .await;
        assert_eq!(details.pairings.len(), 1);
    }

    let stats = system.manager.stats().await.unwrap();
    assert_eq!(stats.matching.committed, 20);
    assert_eq!(stats.store.matched_sessions, 20);
    assert_eq!(system.publisher.count("SessionMatched"), 20);

    drop(system);
    worker.await.unwrap();
}
