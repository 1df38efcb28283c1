// SPDX-License-Identifier: MIT

//! Firestore implementation of [`LedgerStore`].
//!
//! Document layout:
//! - `profiles/{user_id}`
//! - `challenges/{challenge_id}`
//! - `challenge_participants/{challenge_id}_{user_id}`
//! - `daily_logs/{challenge_id}_{user_id}_{date}`
//!
//! Ledger events are applied inside Firestore transactions: the
//! participant and profile reads register the documents for conflict
//! detection, so a concurrent writer forces a retry with fresh data and
//! the idempotency guard then sees the committed entry.

use crate::dates::CalendarDay;
use crate::db::collections;
use crate::db::store::{
    plan_event, ApplyOutcome, AppliedEvent, LedgerEvent, LedgerStore, PlannedEvent,
};
use crate::error::{AppError, Result};
use crate::models::{Challenge, ChallengeParticipant, ChallengeStatus, DailyLog, Profile};
use async_trait::async_trait;
use firestore::FirestoreConsistencySelector;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    fn db_err(e: impl std::fmt::Display) -> AppError {
        AppError::Database(e.to_string())
    }
}

#[async_trait]
impl LedgerStore for FirestoreDb {
    // ─── Profiles ────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(Self::db_err)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.user_id)
            .object(profile)
            .execute()
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.client
            .fluent()
            .select()
            .from(collections::PROFILES)
            .obj()
            .query()
            .await
            .map_err(Self::db_err)
    }

    // ─── Challenges ──────────────────────────────────────────────

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(challenge_id)
            .await
            .map_err(Self::db_err)
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&challenge.challenge_id)
            .object(challenge)
            .execute()
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn find_challenge_by_join_code(&self, join_code: &str) -> Result<Option<Challenge>> {
        let code = join_code.to_string();
        let matches: Vec<Challenge> = self
            .client
            .fluent()
            .select()
            .from(collections::CHALLENGES)
            .filter(move |q| q.for_all([q.field("join_code").eq(code.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(Self::db_err)?;
        Ok(matches.into_iter().next())
    }

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>> {
        self.client
            .fluent()
            .select()
            .from(collections::CHALLENGES)
            .filter(|q| q.for_all([q.field("status").eq(ChallengeStatus::Active)]))
            .obj()
            .query()
            .await
            .map_err(Self::db_err)
    }

    // ─── Participants ────────────────────────────────────────────

    async fn get_participant(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipant>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::PARTICIPANTS)
            .obj()
            .one(&ChallengeParticipant::doc_id(challenge_id, user_id))
            .await
            .map_err(Self::db_err)
    }

    async fn list_participants(&self, challenge_id: &str) -> Result<Vec<ChallengeParticipant>> {
        let challenge_id = challenge_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::PARTICIPANTS)
            .filter(move |q| {
                q.for_all([
                    q.field("challenge_id").eq(challenge_id.clone()),
                    q.field("is_active").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(Self::db_err)
    }

    async fn list_participations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ChallengeParticipant>> {
        let user_id = user_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::PARTICIPANTS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("is_active").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(Self::db_err)
    }

    async fn list_all_participants(&self) -> Result<Vec<ChallengeParticipant>> {
        self.client
            .fluent()
            .select()
            .from(collections::PARTICIPANTS)
            .obj()
            .query()
            .await
            .map_err(Self::db_err)
    }

    async fn save_participant(&self, participant: &ChallengeParticipant) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::PARTICIPANTS)
            .document_id(&ChallengeParticipant::doc_id(
                &participant.challenge_id,
                &participant.user_id,
            ))
            .object(participant)
            .execute()
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    // ─── Daily logs ──────────────────────────────────────────────

    async fn get_daily_log(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
    ) -> Result<Option<DailyLog>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::DAILY_LOGS)
            .obj()
            .one(&DailyLog::doc_id(challenge_id, user_id, date))
            .await
            .map_err(Self::db_err)
    }

    // ─── Ledger ──────────────────────────────────────────────────

    async fn apply_event(&self, event: &LedgerEvent) -> Result<ApplyOutcome> {
        // A contended commit aborts; the retry re-reads fresh state and
        // the idempotency guard then reports the event as already applied.
        let mut last_err = None;
        for attempt in 1..=MAX_TXN_ATTEMPTS {
            match self.try_apply_event(event).await {
                Ok(outcome) => return Ok(outcome),
                Err(e @ AppError::Database(_)) => {
                    tracing::warn!(
                        challenge_id = event.challenge_id(),
                        user_id = event.user_id(),
                        attempt,
                        error = %e,
                        "Ledger transaction failed, retrying"
                    );
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            AppError::Database("Ledger transaction retries exhausted".to_string())
        }))
    }
}

/// Transaction attempts before giving up on a contended ledger event.
const MAX_TXN_ATTEMPTS: u32 = 5;

impl FirestoreDb {
    /// One transactional attempt at applying a ledger event.
    async fn try_apply_event(&self, event: &LedgerEvent) -> Result<ApplyOutcome> {
        let challenge_id = event.challenge_id();
        let user_id = event.user_id();
        let date = event.date();
        let now = chrono::Utc::now().to_rfc3339();

        // Begin a transaction
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reads must carry the transaction's consistency selector so the
        // documents are registered in its read set; a concurrent writer
        // then aborts the commit instead of silently losing an update.
        let reader = Self {
            client: self.client.clone_with_consistency_selector(
                FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
            ),
        };

        let state = async {
            let participant = reader.get_participant(challenge_id, user_id).await?;
            let profile = reader.get_profile(user_id).await?;
            let existing_log = match event {
                LedgerEvent::Completion { .. } | LedgerEvent::Miss { .. } => {
                    reader.get_daily_log(challenge_id, user_id, date).await?
                }
                _ => None,
            };
            Ok::<_, AppError>((participant, profile, existing_log))
        }
        .await;

        let (participant, profile, existing_log) = match state {
            Ok(state) => state,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        let plan = match plan_event(event, participant, profile, existing_log.as_ref(), &now) {
            Ok(plan) => plan,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        let plan = match plan {
            PlannedEvent::Skip(reason) => {
                tracing::debug!(
                    challenge_id,
                    user_id,
                    date = %date,
                    ?reason,
                    "Ledger event skipped (idempotent)"
                );
                // Rollback the transaction since we don't need to write
                let _ = transaction.rollback().await;
                return Ok(ApplyOutcome::Skipped(reason));
            }
            PlannedEvent::Write(plan) => plan,
        };

        // Add all writes to the transaction
        self.client
            .fluent()
            .update()
            .in_col(collections::PARTICIPANTS)
            .document_id(&ChallengeParticipant::doc_id(challenge_id, user_id))
            .object(&plan.participant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participant to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(user_id)
            .object(&plan.profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        if let Some(log) = &plan.daily_log {
            self.client
                .fluent()
                .update()
                .in_col(collections::DAILY_LOGS)
                .document_id(&DailyLog::doc_id(challenge_id, user_id, date))
                .object(log)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add daily log to transaction: {}", e))
                })?;
        }

        // Commit atomically
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            challenge_id,
            user_id,
            date = %date,
            bonus = plan.bonus,
            "Ledger event applied atomically"
        );

        Ok(ApplyOutcome::Applied(AppliedEvent {
            participant: plan.participant,
            profile: plan.profile,
            bonus: plan.bonus,
        }))
    }
}
