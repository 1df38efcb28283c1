// SPDX-License-Identifier: MIT

//! Check-in workflow: validate, upload proof, then apply the completion.
//!
//! Ordering is the hard invariant here: the proof upload happens before
//! any ledger mutation, and a failure at any stage leaves the user's
//! points and streak exactly as they were. The ledger append itself is
//! atomic and idempotent per day (see [`LedgerStore::apply_event`]), so a
//! replayed request gets a conflict instead of double credit.

use crate::dates::CalendarDay;
use crate::db::{ApplyOutcome, LedgerEvent, LedgerStore};
use crate::error::{AppError, Result};
use crate::models::daily_log::GeoPoint;
use crate::models::{Challenge, ChallengeStatus};
use crate::services::proof::ProofStore;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Check-in request body.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    /// Day being completed; defaults to today. Past days within the
    /// challenge are accepted (late logging), future days are not.
    pub date: Option<CalendarDay>,
    /// Base64-encoded proof image
    #[validate(length(min = 1, max = 10_000_000))]
    pub proof_image: String,
    pub location: Option<GeoPoint>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// What a successful check-in did.
#[derive(Debug, Serialize)]
pub struct CheckInResult {
    pub date: CalendarDay,
    pub current_points: i64,
    pub streak_current: u32,
    pub streak_best: u32,
    pub bonus: i64,
    pub proof_url: String,
}

/// The moment a check-in arrives, in the server's local timezone.
#[derive(Debug, Clone, Copy)]
pub struct CheckInClock {
    pub today: CalendarDay,
    pub minutes_since_midnight: u16,
}

impl CheckInClock {
    pub fn now() -> Self {
        use chrono::Timelike;
        let now = chrono::Local::now();
        Self {
            today: CalendarDay::new(now.date_naive()),
            minutes_since_midnight: (now.hour() * 60 + now.minute()) as u16,
        }
    }
}

/// Validate and record a check-in.
pub async fn check_in<S, P>(
    store: &S,
    proofs: &P,
    challenge_id: &str,
    user_id: &str,
    request: CheckInRequest,
    clock: CheckInClock,
) -> Result<CheckInResult>
where
    S: LedgerStore + ?Sized,
    P: ProofStore + ?Sized,
{
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let challenge = store
        .get_challenge(challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

    let date = request.date.unwrap_or(clock.today);
    validate_check_in(&challenge, date, clock, request.location)?;

    let image = BASE64
        .decode(&request.proof_image)
        .map_err(|_| AppError::BadRequest("proof_image is not valid base64".to_string()))?;

    // Upload first. If this fails, the ledger is never touched.
    let proof_url = proofs
        .store_proof(challenge_id, user_id, date, &image)
        .await?;

    let event = LedgerEvent::Completion {
        challenge_id: challenge_id.to_string(),
        user_id: user_id.to_string(),
        date,
        proof_url: proof_url.clone(),
        location: request.location,
        note: request.note,
    };

    match store.apply_event(&event).await? {
        ApplyOutcome::Applied(applied) => {
            tracing::info!(
                challenge_id,
                user_id,
                date = %date,
                streak = applied.participant.streak_current,
                bonus = applied.bonus,
                "Check-in recorded"
            );
            Ok(CheckInResult {
                date,
                current_points: applied.participant.current_points,
                streak_current: applied.participant.streak_current,
                streak_best: applied.participant.streak_best,
                bonus: applied.bonus,
                proof_url,
            })
        }
        ApplyOutcome::Skipped(_) => Err(AppError::Conflict(format!(
            "Already checked in for {}",
            date
        ))),
    }
}

/// Precondition checks: nothing here mutates state.
fn validate_check_in(
    challenge: &Challenge,
    date: CalendarDay,
    clock: CheckInClock,
    location: Option<GeoPoint>,
) -> Result<()> {
    if challenge.status != ChallengeStatus::Active {
        return Err(AppError::Conflict("Challenge is not active".to_string()));
    }
    if date > clock.today {
        return Err(AppError::BadRequest(
            "Cannot check in for a future day".to_string(),
        ));
    }
    if date < challenge.start_date {
        return Err(AppError::BadRequest(
            "Challenge has not started yet".to_string(),
        ));
    }
    if date > challenge.end_date {
        return Err(AppError::BadRequest("Challenge has ended".to_string()));
    }
    // The daily window only constrains same-day check-ins
    if date == clock.today && !challenge.within_time_window(clock.minutes_since_midnight) {
        return Err(AppError::Conflict(
            "Outside the challenge's check-in window".to_string(),
        ));
    }
    if challenge.requires_location() {
        let loc = location.ok_or_else(|| {
            AppError::BadRequest("This challenge requires a check-in location".to_string())
        })?;
        if !challenge.within_geofence(loc.lat, loc.lng) {
            return Err(AppError::BadRequest(
                "Check-in location is outside the challenge area".to_string(),
            ));
        }
    }
    Ok(())
}
