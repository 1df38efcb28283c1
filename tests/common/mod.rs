// SPDX-License-Identifier: MIT

use challengers_api::config::Config;
use challengers_api::dates::CalendarDay;
use challengers_api::db::{ApplyOutcome, FirestoreDb, LedgerEvent, LedgerStore, MemoryStore};
use challengers_api::error::{AppError, Result};
use challengers_api::models::ledger::JoinKind;
use challengers_api::models::{
    Challenge, ChallengeParticipant, ChallengeStatus, DailyLog, Profile,
};
use challengers_api::routes::create_router;
use challengers_api::services::{MemoryProofStore, PushService};
use challengers_api::AppState;
use async_trait::async_trait;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection (emulator).
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over in-memory backends.
/// Returns the router, the shared state, and the store for direct seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState {
        config: Config::test_default(),
        store: store.clone(),
        proofs: Arc::new(MemoryProofStore::new()),
        push: PushService::disabled(),
    });
    (create_router(state.clone()), state, store)
}

/// Create a valid JWT for tests.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    challengers_api::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create test JWT")
}

#[allow(dead_code)]
pub fn day(s: &str) -> CalendarDay {
    s.parse().expect("valid calendar day")
}

/// Seed a profile directly in the store.
#[allow(dead_code)]
pub async fn seed_profile(store: &dyn LedgerStore, user_id: &str) -> Profile {
    let profile = Profile::new(user_id, &format!("User {}", user_id), None, "2025-01-01T00:00:00Z");
    store.upsert_profile(&profile).await.expect("seed profile");
    profile
}

/// Seed an active challenge with the given date range.
#[allow(dead_code)]
pub async fn seed_challenge(
    store: &dyn LedgerStore,
    challenge_id: &str,
    start: CalendarDay,
    end: CalendarDay,
) -> Challenge {
    let challenge = Challenge {
        challenge_id: challenge_id.to_string(),
        owner_id: "owner".to_string(),
        title: format!("Challenge {}", challenge_id),
        description: String::new(),
        start_date: start,
        end_date: end,
        time_window_start: None,
        time_window_end: None,
        rest_days: vec![],
        locations: vec![],
        join_code: "ABC234".to_string(),
        status: ChallengeStatus::Active,
        created_at: "2025-01-01T00:00:00Z".to_string(),
    };
    store.upsert_challenge(&challenge).await.expect("seed challenge");
    challenge
}

/// Seed a profile and join it to a challenge on `joined`.
#[allow(dead_code)]
pub async fn seed_participant(
    store: &dyn LedgerStore,
    challenge_id: &str,
    user_id: &str,
    joined: CalendarDay,
) -> ChallengeParticipant {
    seed_profile(store, user_id).await;
    let event = LedgerEvent::Join {
        challenge_id: challenge_id.to_string(),
        user_id: user_id.to_string(),
        date: joined,
        kind: JoinKind::Joined,
    };
    match store.apply_event(&event).await.expect("join event") {
        ApplyOutcome::Applied(applied) => applied.participant,
        ApplyOutcome::Skipped(reason) => panic!("seed join skipped: {:?}", reason),
    }
}

/// Store wrapper that fails every ledger write for one user, for
/// exercising the scanner's continue-on-error behavior.
#[allow(dead_code)]
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    pub fail_user: String,
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.inner.get_profile(user_id).await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.inner.upsert_profile(profile).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.inner.list_profiles().await
    }

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        self.inner.get_challenge(challenge_id).await
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.inner.upsert_challenge(challenge).await
    }

    async fn find_challenge_by_join_code(&self, join_code: &str) -> Result<Option<Challenge>> {
        self.inner.find_challenge_by_join_code(join_code).await
    }

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>> {
        self.inner.list_active_challenges().await
    }

    async fn get_participant(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipant>> {
        self.inner.get_participant(challenge_id, user_id).await
    }

    async fn list_participants(&self, challenge_id: &str) -> Result<Vec<ChallengeParticipant>> {
        self.inner.list_participants(challenge_id).await
    }

    async fn list_participations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ChallengeParticipant>> {
        self.inner.list_participations_for_user(user_id).await
    }

    async fn list_all_participants(&self) -> Result<Vec<ChallengeParticipant>> {
        self.inner.list_all_participants().await
    }

    async fn save_participant(&self, participant: &ChallengeParticipant) -> Result<()> {
        self.inner.save_participant(participant).await
    }

    async fn get_daily_log(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
    ) -> Result<Option<DailyLog>> {
        self.inner.get_daily_log(challenge_id, user_id, date).await
    }

    async fn apply_event(&self, event: &LedgerEvent) -> Result<ApplyOutcome> {
        if event.user_id() == self.fail_user {
            return Err(AppError::Database("injected failure".to_string()));
        }
        self.inner.apply_event(event).await
    }
}
