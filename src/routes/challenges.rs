// SPDX-License-Identifier: MIT

//! Challenge routes: CRUD, membership, check-in, and the chart timeline.

use crate::dates::{parse_window_minutes, CalendarDay};
use crate::db::{ApplyOutcome, LedgerEvent};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::challenge::generate_join_code;
use crate::models::ledger::JoinKind;
use crate::models::{Challenge, ChallengeParticipant, ChallengeStatus, GeoFence};
use crate::services::checkin::{check_in, CheckInClock, CheckInRequest, CheckInResult};
use crate::services::projection::{project_timeline, TimelineRow};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Challenge routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/challenges", post(create_challenge).get(list_challenges))
        .route("/api/challenges/join", post(join_challenge))
        .route(
            "/api/challenges/{id}",
            get(get_challenge).put(update_challenge),
        )
        .route("/api/challenges/{id}/leave", post(leave_challenge))
        .route("/api/challenges/{id}/checkin", post(check_in_challenge))
        .route("/api/challenges/{id}/timeline", get(get_timeline))
}

fn generate_challenge_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

// ─── Create / list / detail / edit ───────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    pub start_date: CalendarDay,
    pub end_date: CalendarDay,
    pub time_window_start: Option<String>,
    pub time_window_end: Option<String>,
    #[serde(default)]
    pub rest_days: Vec<u8>,
    #[serde(default)]
    pub locations: Vec<GeoFence>,
}

impl CreateChallengeRequest {
    fn validate_semantics(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(AppError::BadRequest(
                "end_date precedes start_date".to_string(),
            ));
        }
        validate_rest_days(&self.rest_days)?;
        validate_time_window(&self.time_window_start, &self.time_window_end)?;
        validate_locations(&self.locations)
    }
}

// Shared by create and edit: a challenge must never be stored with an
// unparseable window (within_time_window would silently treat it as
// unrestricted) or an out-of-range geofence.

fn validate_rest_days(rest_days: &[u8]) -> Result<()> {
    if rest_days.iter().any(|d| *d > 6) {
        return Err(AppError::BadRequest(
            "rest_days must be weekday indices 0-6".to_string(),
        ));
    }
    Ok(())
}

fn validate_time_window(start: &Option<String>, end: &Option<String>) -> Result<()> {
    for bound in [start, end] {
        if let Some(bound) = bound {
            if parse_window_minutes(bound).is_none() {
                return Err(AppError::BadRequest(format!(
                    "Invalid time window bound: {}",
                    bound
                )));
            }
        }
    }
    if start.is_some() != end.is_some() {
        return Err(AppError::BadRequest(
            "Time window needs both start and end".to_string(),
        ));
    }
    Ok(())
}

fn validate_locations(locations: &[GeoFence]) -> Result<()> {
    if locations.iter().any(|f| {
        !(-90.0..=90.0).contains(&f.lat)
            || !(-180.0..=180.0).contains(&f.lng)
            || f.radius_meters <= 0.0
    }) {
        return Err(AppError::BadRequest("Invalid geofence".to_string()));
    }
    Ok(())
}

/// A challenge together with the caller's participant row.
#[derive(Debug, Serialize)]
pub struct ChallengeWithParticipant {
    pub challenge: Challenge,
    pub participant: ChallengeParticipant,
}

/// Create a challenge. The creator joins it immediately.
async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateChallengeRequest>,
) -> Result<Json<ChallengeWithParticipant>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    payload.validate_semantics()?;

    // The creator needs a profile before any ledger event can credit it
    if state.store.get_profile(&user.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Profile {} not found",
            user.user_id
        )));
    }

    let challenge = Challenge {
        challenge_id: generate_challenge_id(),
        owner_id: user.user_id.clone(),
        title: payload.title,
        description: payload.description,
        start_date: payload.start_date,
        end_date: payload.end_date,
        time_window_start: payload.time_window_start,
        time_window_end: payload.time_window_end,
        rest_days: payload.rest_days,
        locations: payload.locations,
        join_code: generate_join_code(),
        status: ChallengeStatus::Active,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    state.store.upsert_challenge(&challenge).await?;

    let event = LedgerEvent::Join {
        challenge_id: challenge.challenge_id.clone(),
        user_id: user.user_id.clone(),
        date: CalendarDay::today(),
        kind: JoinKind::Created,
    };
    let participant = match state.store.apply_event(&event).await? {
        ApplyOutcome::Applied(applied) => applied.participant,
        ApplyOutcome::Skipped(_) => {
            // Freshly generated challenge ID, so no prior membership can exist
            return Err(AppError::Internal(anyhow::anyhow!(
                "Creator join skipped for new challenge"
            )));
        }
    };

    tracing::info!(
        challenge_id = %challenge.challenge_id,
        owner_id = %user.user_id,
        "Challenge created"
    );
    Ok(Json(ChallengeWithParticipant {
        challenge,
        participant,
    }))
}

/// List the caller's active challenges.
async fn list_challenges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ChallengeWithParticipant>>> {
    let participations = state
        .store
        .list_participations_for_user(&user.user_id)
        .await?;

    let mut result = Vec::with_capacity(participations.len());
    for participant in participations {
        match state.store.get_challenge(&participant.challenge_id).await? {
            Some(challenge) => result.push(ChallengeWithParticipant {
                challenge,
                participant,
            }),
            None => {
                tracing::warn!(
                    challenge_id = %participant.challenge_id,
                    user_id = %user.user_id,
                    "Participation references missing challenge"
                );
            }
        }
    }
    Ok(Json(result))
}

/// Challenge detail shown to participants.
#[derive(Debug, Serialize)]
pub struct ChallengeDetail {
    pub challenge: Challenge,
    pub participants: Vec<ParticipantSummary>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantSummary {
    pub user_id: String,
    pub current_points: i64,
    pub streak_current: u32,
    pub streak_best: u32,
}

/// Get one challenge with its active participants.
async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<String>,
) -> Result<Json<ChallengeDetail>> {
    let challenge = state
        .store
        .get_challenge(&challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

    let participants = state
        .store
        .list_participants(&challenge_id)
        .await?
        .into_iter()
        .map(|p| ParticipantSummary {
            user_id: p.user_id,
            current_points: p.current_points,
            streak_current: p.streak_current,
            streak_best: p.streak_best,
        })
        .collect();

    Ok(Json(ChallengeDetail {
        challenge,
        participants,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChallengeRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub time_window_start: Option<String>,
    pub time_window_end: Option<String>,
    pub rest_days: Option<Vec<u8>>,
    pub locations: Option<Vec<GeoFence>>,
    pub status: Option<ChallengeStatus>,
}

/// Edit a challenge (owner only).
async fn update_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Json(payload): Json<UpdateChallengeRequest>,
) -> Result<Json<Challenge>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut challenge = state
        .store
        .get_challenge(&challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

    if challenge.owner_id != user.user_id {
        return Err(AppError::BadRequest(
            "Only the challenge owner can edit it".to_string(),
        ));
    }

    if let Some(title) = payload.title {
        challenge.title = title;
    }
    if let Some(description) = payload.description {
        challenge.description = description;
    }
    if payload.time_window_start.is_some() || payload.time_window_end.is_some() {
        challenge.time_window_start = payload.time_window_start;
        challenge.time_window_end = payload.time_window_end;
    }
    if let Some(rest_days) = payload.rest_days {
        challenge.rest_days = rest_days;
    }
    if let Some(locations) = payload.locations {
        challenge.locations = locations;
    }
    if let Some(status) = payload.status {
        challenge.status = status;
    }

    // The edited document must satisfy the same semantics as a new one
    validate_rest_days(&challenge.rest_days)?;
    validate_time_window(&challenge.time_window_start, &challenge.time_window_end)?;
    validate_locations(&challenge.locations)?;

    state.store.upsert_challenge(&challenge).await?;
    Ok(Json(challenge))
}

// ─── Membership ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct JoinChallengeRequest {
    #[validate(length(min = 6, max = 6))]
    pub join_code: String,
}

/// Join a challenge by code.
async fn join_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<JoinChallengeRequest>,
) -> Result<Json<ChallengeWithParticipant>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let code = payload.join_code.to_uppercase();
    let challenge = state
        .store
        .find_challenge_by_join_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No challenge with code {}", code)))?;

    if challenge.status != ChallengeStatus::Active {
        return Err(AppError::Conflict("Challenge is not active".to_string()));
    }
    let today = CalendarDay::today();
    if today > challenge.end_date {
        return Err(AppError::Conflict("Challenge has ended".to_string()));
    }

    let event = LedgerEvent::Join {
        challenge_id: challenge.challenge_id.clone(),
        user_id: user.user_id.clone(),
        date: today,
        kind: JoinKind::Joined,
    };
    match state.store.apply_event(&event).await? {
        ApplyOutcome::Applied(applied) => Ok(Json(ChallengeWithParticipant {
            challenge,
            participant: applied.participant,
        })),
        ApplyOutcome::Skipped(_) => Err(AppError::Conflict(
            "Already participating in this challenge".to_string(),
        )),
    }
}

/// Leave a challenge: the participant row is deactivated, not deleted.
async fn leave_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let event = LedgerEvent::Leave {
        challenge_id: challenge_id.clone(),
        user_id: user.user_id.clone(),
        date: CalendarDay::today(),
    };
    match state.store.apply_event(&event).await? {
        ApplyOutcome::Applied(applied) => {
            tracing::info!(
                challenge_id = %challenge_id,
                user_id = %user.user_id,
                "Left challenge"
            );
            Ok(Json(serde_json::json!({
                "success": true,
                "profile_points": applied.profile.current_points,
            })))
        }
        ApplyOutcome::Skipped(_) => Err(AppError::Conflict(
            "Not an active participant".to_string(),
        )),
    }
}

// ─── Check-in ────────────────────────────────────────────────────

/// Record a verified daily check-in.
async fn check_in_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Json(payload): Json<CheckInRequest>,
) -> Result<Json<CheckInResult>> {
    let result = check_in(
        state.store.as_ref(),
        state.proofs.as_ref(),
        &challenge_id,
        &user.user_id,
        payload,
        CheckInClock::now(),
    )
    .await?;

    if result.bonus > 0 {
        state
            .push
            .notify(
                &user.user_id,
                "Streak bonus!",
                &format!(
                    "{} days in a row earned you {} bonus points.",
                    result.streak_current, result.bonus
                ),
            )
            .await;
    }

    Ok(Json(result))
}

// ─── Timeline ────────────────────────────────────────────────────

/// Dense day-by-day points timeline for charting.
async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<String>,
) -> Result<Json<Vec<TimelineRow>>> {
    let challenge = state
        .store
        .get_challenge(&challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

    let participants = state.store.list_participants(&challenge_id).await?;
    let rows = project_timeline(&challenge, &participants, CalendarDay::today());
    Ok(Json(rows))
}
