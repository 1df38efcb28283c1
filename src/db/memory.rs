// SPDX-License-Identifier: MIT

//! In-memory implementation of [`LedgerStore`] for tests and offline
//! development.
//!
//! A single mutex guards all collections, so `apply_event`'s
//! read-modify-write runs under the same exclusion the Firestore
//! implementation gets from transactions.

use crate::dates::CalendarDay;
use crate::db::store::{
    plan_event, ApplyOutcome, AppliedEvent, LedgerEvent, LedgerStore, PlannedEvent,
};
use crate::error::Result;
use crate::models::{Challenge, ChallengeParticipant, ChallengeStatus, DailyLog, Profile};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    challenges: HashMap<String, Challenge>,
    participants: HashMap<String, ChallengeParticipant>,
    daily_logs: HashMap<String, DailyLog>,
}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: drop a daily log, leaving the ledger entry in place.
    /// Lets tests reproduce histories that diverge from the logs.
    pub async fn remove_daily_log(&self, challenge_id: &str, user_id: &str, date: CalendarDay) {
        self.inner
            .lock()
            .await
            .daily_logs
            .remove(&DailyLog::doc_id(challenge_id, user_id, date));
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.inner
            .lock()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.inner.lock().await.profiles.values().cloned().collect())
    }

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        Ok(self.inner.lock().await.challenges.get(challenge_id).cloned())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.inner
            .lock()
            .await
            .challenges
            .insert(challenge.challenge_id.clone(), challenge.clone());
        Ok(())
    }

    async fn find_challenge_by_join_code(&self, join_code: &str) -> Result<Option<Challenge>> {
        Ok(self
            .inner
            .lock()
            .await
            .challenges
            .values()
            .find(|c| c.join_code == join_code)
            .cloned())
    }

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self
            .inner
            .lock()
            .await
            .challenges
            .values()
            .filter(|c| c.status == ChallengeStatus::Active)
            .cloned()
            .collect())
    }

    async fn get_participant(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipant>> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .get(&ChallengeParticipant::doc_id(challenge_id, user_id))
            .cloned())
    }

    async fn list_participants(&self, challenge_id: &str) -> Result<Vec<ChallengeParticipant>> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.challenge_id == challenge_id && p.is_active)
            .cloned()
            .collect())
    }

    async fn list_participations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ChallengeParticipant>> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.user_id == user_id && p.is_active)
            .cloned()
            .collect())
    }

    async fn list_all_participants(&self) -> Result<Vec<ChallengeParticipant>> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .values()
            .cloned()
            .collect())
    }

    async fn save_participant(&self, participant: &ChallengeParticipant) -> Result<()> {
        self.inner.lock().await.participants.insert(
            ChallengeParticipant::doc_id(&participant.challenge_id, &participant.user_id),
            participant.clone(),
        );
        Ok(())
    }

    async fn get_daily_log(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
    ) -> Result<Option<DailyLog>> {
        Ok(self
            .inner
            .lock()
            .await
            .daily_logs
            .get(&DailyLog::doc_id(challenge_id, user_id, date))
            .cloned())
    }

    async fn apply_event(&self, event: &LedgerEvent) -> Result<ApplyOutcome> {
        let challenge_id = event.challenge_id().to_string();
        let user_id = event.user_id().to_string();
        let date = event.date();
        let now = chrono::Utc::now().to_rfc3339();

        // Hold the lock across the whole read-modify-write
        let mut inner = self.inner.lock().await;

        let participant = inner
            .participants
            .get(&ChallengeParticipant::doc_id(&challenge_id, &user_id))
            .cloned();
        let profile = inner.profiles.get(&user_id).cloned();
        let existing_log = match event {
            LedgerEvent::Completion { .. } | LedgerEvent::Miss { .. } => inner
                .daily_logs
                .get(&DailyLog::doc_id(&challenge_id, &user_id, date))
                .cloned(),
            _ => None,
        };

        let plan = match plan_event(event, participant, profile, existing_log.as_ref(), &now)? {
            PlannedEvent::Skip(reason) => return Ok(ApplyOutcome::Skipped(reason)),
            PlannedEvent::Write(plan) => plan,
        };

        inner.participants.insert(
            ChallengeParticipant::doc_id(&challenge_id, &user_id),
            plan.participant.clone(),
        );
        inner
            .profiles
            .insert(user_id.clone(), plan.profile.clone());
        if let Some(log) = &plan.daily_log {
            inner.daily_logs.insert(
                DailyLog::doc_id(&challenge_id, &user_id, date),
                log.clone(),
            );
        }

        Ok(ApplyOutcome::Applied(AppliedEvent {
            participant: plan.participant,
            profile: plan.profile,
            bonus: plan.bonus,
        }))
    }
}
