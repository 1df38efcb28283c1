// SPDX-License-Identifier: MIT

//! Missed-day scanner tests.
//!
//! Running the scan twice for the same day must charge each participant
//! at most once, rest days and pre-join days are exempt, and a single
//! failing participant never aborts the run.

use challengers_api::db::{LedgerEvent, LedgerStore, MemoryStore};
use challengers_api::models::ledger::MISS_PENALTY;
use challengers_api::models::TaskStatus;
use challengers_api::services::{run_scan, PushService};
use std::sync::Arc;

mod common;
use common::{day, seed_challenge, seed_participant, FailingStore};

#[tokio::test]
async fn test_scan_charges_yesterday_once() {
    let store = MemoryStore::new();
    seed_challenge(&store, "c1", day("2025-12-01"), day("2025-12-31")).await;
    seed_participant(&store, "c1", "u1", day("2025-12-01")).await;

    let push = PushService::disabled();
    let today = day("2025-12-03");

    let report = run_scan(&store, &push, today).await.unwrap();
    assert_eq!(report.misses_applied, 1);
    assert!(report.failures.is_empty());

    // Second run for the same day is a no-op
    let report = run_scan(&store, &push, today).await.unwrap();
    assert_eq!(report.misses_applied, 0);
    assert_eq!(report.skipped, 1);

    let participant = store.get_participant("c1", "u1").await.unwrap().unwrap();
    assert_eq!(participant.current_points, 500 - MISS_PENALTY);
    let missed = participant
        .points_history
        .iter()
        .filter(|e| e.task_status == TaskStatus::Missed)
        .count();
    assert_eq!(missed, 1);
    assert_eq!(participant.streak_current, 0);
}

#[tokio::test]
async fn test_scan_skips_completed_day() {
    let store = MemoryStore::new();
    seed_challenge(&store, "c1", day("2025-12-01"), day("2025-12-31")).await;
    seed_participant(&store, "c1", "u1", day("2025-12-01")).await;

    let event = LedgerEvent::Completion {
        challenge_id: "c1".to_string(),
        user_id: "u1".to_string(),
        date: day("2025-12-02"),
        proof_url: "https://proofs.example/p.jpg".to_string(),
        location: None,
        note: None,
    };
    store.apply_event(&event).await.unwrap();

    let report = run_scan(&store, &PushService::disabled(), day("2025-12-03"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 0);
    assert_eq!(report.skipped, 1);

    let participant = store.get_participant("c1", "u1").await.unwrap().unwrap();
    assert_eq!(participant.current_points, 500);
    assert_eq!(participant.streak_current, 1);
}

#[tokio::test]
async fn test_scan_skips_rest_day() {
    let store = MemoryStore::new();
    let mut challenge = seed_challenge(&store, "c1", day("2025-12-01"), day("2025-12-31")).await;
    // 2025-12-07 is a Sunday
    challenge.rest_days = vec![0];
    store.upsert_challenge(&challenge).await.unwrap();
    seed_participant(&store, "c1", "u1", day("2025-12-01")).await;

    let report = run_scan(&store, &PushService::disabled(), day("2025-12-08"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 0);
    // Rest days short-circuit before the participant loop
    assert_eq!(report.participants_scanned, 0);
}

#[tokio::test]
async fn test_scan_skips_days_before_join_and_outside_range() {
    let store = MemoryStore::new();
    seed_challenge(&store, "c1", day("2025-12-10"), day("2025-12-20")).await;
    // Joined mid-challenge
    seed_participant(&store, "c1", "u1", day("2025-12-15")).await;

    // Yesterday before the challenge starts
    let report = run_scan(&store, &PushService::disabled(), day("2025-12-05"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 0);

    // Yesterday in range but before the participant joined
    let report = run_scan(&store, &PushService::disabled(), day("2025-12-13"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 0);
    assert_eq!(report.skipped, 1);

    // Yesterday after the challenge ended
    let report = run_scan(&store, &PushService::disabled(), day("2025-12-25"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 0);
}

#[tokio::test]
async fn test_scan_join_day_itself_is_scheduled() {
    let store = MemoryStore::new();
    seed_challenge(&store, "c1", day("2025-12-01"), day("2025-12-31")).await;
    seed_participant(&store, "c1", "u1", day("2025-12-02")).await;

    // Yesterday == joined_date: scheduled, charged if not completed
    let report = run_scan(&store, &PushService::disabled(), day("2025-12-03"))
        .await
        .unwrap();
    assert_eq!(report.misses_applied, 1);
}

#[tokio::test]
async fn test_scan_continues_past_failing_participant() {
    let inner = Arc::new(MemoryStore::new());
    seed_challenge(inner.as_ref(), "c1", day("2025-12-01"), day("2025-12-31")).await;
    seed_participant(inner.as_ref(), "c1", "u1", day("2025-12-01")).await;
    seed_participant(inner.as_ref(), "c1", "u2", day("2025-12-01")).await;
    seed_participant(inner.as_ref(), "c1", "u3", day("2025-12-01")).await;

    let store = FailingStore {
        inner: inner.clone(),
        fail_user: "u2".to_string(),
    };

    let report = run_scan(&store, &PushService::disabled(), day("2025-12-03"))
        .await
        .unwrap();

    assert_eq!(report.misses_applied, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].user_id, "u2");

    // The healthy participants were still charged
    for user in ["u1", "u3"] {
        let p = inner.get_participant("c1", user).await.unwrap().unwrap();
        assert_eq!(p.current_points, 400);
    }
    let p = inner.get_participant("c1", "u2").await.unwrap().unwrap();
    assert_eq!(p.current_points, 500);
}

#[tokio::test]
async fn test_scan_ignores_inactive_challenges_and_participants() {
    use challengers_api::models::ChallengeStatus;

    let store = MemoryStore::new();
    let mut challenge = seed_challenge(&store, "c1", day("2025-12-01"), day("2025-12-31")).await;
    seed_participant(&store, "c1", "u1", day("2025-12-01")).await;

    // Left participants are not scanned
    let leave = LedgerEvent::Leave {
        challenge_id: "c1".to_string(),
        user_id: "u1".to_string(),
        date: day("2025-12-02"),
    };
    store.apply_event(&leave).await.unwrap();

    let report = run_scan(&store, &PushService::disabled(), day("2025-12-03"))
        .await
        .unwrap();
    assert_eq!(report.participants_scanned, 0);
    assert_eq!(report.misses_applied, 0);

    // Cancelled challenges are not scanned at all
    challenge.status = ChallengeStatus::Cancelled;
    store.upsert_challenge(&challenge).await.unwrap();
    let report = run_scan(&store, &PushService::disabled(), day("2025-12-03"))
        .await
        .unwrap();
    assert_eq!(report.challenges_scanned, 0);
}
