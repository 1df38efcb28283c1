// SPDX-License-Identifier: MIT

//! The `LedgerStore` capability trait and the ledger event types.
//!
//! Handlers and batch jobs depend on this abstraction, not on a concrete
//! backend. Two implementations exist: [`crate::db::FirestoreDb`]
//! (production, Firestore transactions) and [`crate::db::MemoryStore`]
//! (tests and offline mode, a process-local mutex).
//!
//! The one method with real correctness weight is [`LedgerStore::apply_event`]:
//! it must perform the read-check-compute-write sequence for a ledger
//! event atomically, so that two concurrent attempts to record the same
//! `(challenge, user, date)` produce exactly one history entry.

use crate::dates::CalendarDay;
use crate::error::{AppError, Result};
use crate::models::daily_log::{DailyLog, GeoPoint, LogStatus};
use crate::models::ledger::{self, JoinKind};
use crate::models::{Challenge, ChallengeParticipant, Profile};
use async_trait::async_trait;

/// A point-affecting event, keyed by `(challenge, user, date)`.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A verified check-in. The proof upload has already succeeded by the
    /// time this event is applied.
    Completion {
        challenge_id: String,
        user_id: String,
        date: CalendarDay,
        proof_url: String,
        location: Option<GeoPoint>,
        note: Option<String>,
    },
    /// A scheduled day with no completion, found by the scanner.
    Miss {
        challenge_id: String,
        user_id: String,
        date: CalendarDay,
        penalty: i64,
    },
    /// Joining (or creating) a challenge.
    Join {
        challenge_id: String,
        user_id: String,
        date: CalendarDay,
        kind: JoinKind,
    },
    /// Leaving a challenge.
    Leave {
        challenge_id: String,
        user_id: String,
        date: CalendarDay,
    },
}

impl LedgerEvent {
    pub fn challenge_id(&self) -> &str {
        match self {
            LedgerEvent::Completion { challenge_id, .. }
            | LedgerEvent::Miss { challenge_id, .. }
            | LedgerEvent::Join { challenge_id, .. }
            | LedgerEvent::Leave { challenge_id, .. } => challenge_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            LedgerEvent::Completion { user_id, .. }
            | LedgerEvent::Miss { user_id, .. }
            | LedgerEvent::Join { user_id, .. }
            | LedgerEvent::Leave { user_id, .. } => user_id,
        }
    }

    pub fn date(&self) -> CalendarDay {
        match self {
            LedgerEvent::Completion { date, .. }
            | LedgerEvent::Miss { date, .. }
            | LedgerEvent::Join { date, .. }
            | LedgerEvent::Leave { date, .. } => *date,
        }
    }
}

/// Why an event was skipped rather than applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The participant history already has an entry for the date.
    AlreadyRecorded,
    /// A daily log already accounts for the date.
    LogExists,
    /// The user is already an active participant.
    AlreadyJoined,
    /// Leave for a user who is not an active participant.
    NotParticipating,
}

/// Result of applying a ledger event.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Applied(AppliedEvent),
    Skipped(SkipReason),
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }
}

/// The documents as written by a successfully applied event.
#[derive(Debug, Clone)]
pub struct AppliedEvent {
    pub participant: ChallengeParticipant,
    pub profile: Profile,
    /// Streak bonus granted by a completion (0 otherwise).
    pub bonus: i64,
}

/// The write set an event application produced, shared by both store
/// implementations. Backends persist all of it atomically or none of it.
pub(crate) struct EventPlan {
    pub participant: ChallengeParticipant,
    pub profile: Profile,
    pub daily_log: Option<DailyLog>,
    pub bonus: i64,
}

pub(crate) enum PlannedEvent {
    Write(EventPlan),
    Skip(SkipReason),
}

/// Compute the post-event documents for `event`.
///
/// Pure with respect to the store: the backend supplies the current
/// participant/profile/log state (read inside its transaction or lock)
/// and persists the returned write set in the same transaction.
pub(crate) fn plan_event(
    event: &LedgerEvent,
    participant: Option<ChallengeParticipant>,
    profile: Option<Profile>,
    existing_log: Option<&DailyLog>,
    now: &str,
) -> Result<PlannedEvent> {
    let mut profile = profile.ok_or_else(|| {
        AppError::NotFound(format!("Profile {} not found", event.user_id()))
    })?;

    match event {
        LedgerEvent::Completion {
            challenge_id,
            user_id,
            date,
            proof_url,
            location,
            note,
        } => {
            let mut participant = require_active(participant, challenge_id, user_id)?;
            if existing_log.is_some() {
                return Ok(PlannedEvent::Skip(SkipReason::LogExists));
            }
            match ledger::record_completion(&mut participant, &mut profile, *date, now) {
                Some(result) => Ok(PlannedEvent::Write(EventPlan {
                    daily_log: Some(DailyLog {
                        challenge_id: challenge_id.clone(),
                        user_id: user_id.clone(),
                        date: *date,
                        status: LogStatus::Completed,
                        proof_url: Some(proof_url.clone()),
                        location: *location,
                        note: note.clone(),
                        created_at: now.to_string(),
                    }),
                    participant,
                    profile,
                    bonus: result.bonus,
                })),
                None => Ok(PlannedEvent::Skip(SkipReason::AlreadyRecorded)),
            }
        }

        LedgerEvent::Miss {
            challenge_id,
            user_id,
            date,
            penalty,
        } => {
            let mut participant = require_active(participant, challenge_id, user_id)?;
            if existing_log.is_some() {
                return Ok(PlannedEvent::Skip(SkipReason::LogExists));
            }
            if !ledger::record_miss(&mut participant, &mut profile, *date, *penalty, now) {
                return Ok(PlannedEvent::Skip(SkipReason::AlreadyRecorded));
            }
            Ok(PlannedEvent::Write(EventPlan {
                daily_log: Some(DailyLog {
                    challenge_id: challenge_id.clone(),
                    user_id: user_id.clone(),
                    date: *date,
                    status: LogStatus::Missed,
                    proof_url: None,
                    location: None,
                    note: None,
                    created_at: now.to_string(),
                }),
                participant,
                profile,
                bonus: 0,
            }))
        }

        LedgerEvent::Join {
            challenge_id,
            user_id,
            date,
            kind,
        } => match participant {
            Some(existing) if existing.is_active => {
                Ok(PlannedEvent::Skip(SkipReason::AlreadyJoined))
            }
            Some(mut existing) => {
                // Returning participant: reactivate, keep history, no re-credit
                existing.is_active = true;
                existing.updated_at = now.to_string();
                Ok(PlannedEvent::Write(EventPlan {
                    participant: existing,
                    profile,
                    daily_log: None,
                    bonus: 0,
                }))
            }
            None => {
                let participant =
                    ledger::record_join(challenge_id, user_id, *kind, &mut profile, *date, now);
                Ok(PlannedEvent::Write(EventPlan {
                    participant,
                    profile,
                    daily_log: None,
                    bonus: 0,
                }))
            }
        },

        LedgerEvent::Leave { date, .. } => match participant {
            Some(mut participant) if participant.is_active => {
                ledger::record_leave(&mut participant, &mut profile, *date, now);
                Ok(PlannedEvent::Write(EventPlan {
                    participant,
                    profile,
                    daily_log: None,
                    bonus: 0,
                }))
            }
            // Already left (or never joined): an idempotent no-op, not an
            // error, so a replayed leave cannot double-debit the profile
            _ => Ok(PlannedEvent::Skip(SkipReason::NotParticipating)),
        },
    }
}

fn require_active(
    participant: Option<ChallengeParticipant>,
    challenge_id: &str,
    user_id: &str,
) -> Result<ChallengeParticipant> {
    match participant {
        Some(p) if p.is_active => Ok(p),
        _ => Err(AppError::NotFound(format!(
            "User {} is not an active participant of challenge {}",
            user_id, challenge_id
        ))),
    }
}

/// Abstraction over the document store backing the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ── Profiles ─────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
    /// All profiles (repair tool).
    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    // ── Challenges ───────────────────────────────────────────────

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>>;
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<()>;
    async fn find_challenge_by_join_code(&self, join_code: &str) -> Result<Option<Challenge>>;
    /// Challenges with status `active` (scanner input).
    async fn list_active_challenges(&self) -> Result<Vec<Challenge>>;

    // ── Participants ─────────────────────────────────────────────

    async fn get_participant(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipant>>;
    /// Active participants of one challenge.
    async fn list_participants(&self, challenge_id: &str) -> Result<Vec<ChallengeParticipant>>;
    /// A user's active participations across all challenges.
    async fn list_participations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ChallengeParticipant>>;
    /// Every participant row, active or not (repair tool).
    async fn list_all_participants(&self) -> Result<Vec<ChallengeParticipant>>;
    /// Direct participant write (repair tool only; ledger mutations go
    /// through [`Self::apply_event`]).
    async fn save_participant(&self, participant: &ChallengeParticipant) -> Result<()>;

    // ── Daily logs ───────────────────────────────────────────────

    async fn get_daily_log(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
    ) -> Result<Option<DailyLog>>;

    // ── The ledger ───────────────────────────────────────────────

    /// Atomically apply a ledger event.
    ///
    /// The idempotency check, the point/streak computation, and all
    /// document writes (participant, profile, daily log) happen under one
    /// transaction; a concurrent attempt for the same day observes the
    /// committed entry and returns `Skipped`.
    async fn apply_event(&self, event: &LedgerEvent) -> Result<ApplyOutcome>;
}
