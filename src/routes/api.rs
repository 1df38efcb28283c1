// SPDX-License-Identifier: MIT

//! Profile routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Profile;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Profile routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", post(ensure_profile))
        .route("/api/me", get(get_me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EnsureProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(email)]
    pub email: Option<String>,
}

/// Create the user's profile on first sign-in (idempotent).
///
/// An existing profile is returned unchanged; a fresh one starts with
/// 500 points.
async fn ensure_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EnsureProfileRequest>,
) -> Result<Json<Profile>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(existing) = state.store.get_profile(&user.user_id).await? {
        return Ok(Json(existing));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let profile = Profile::new(&user.user_id, &payload.display_name, payload.email, &now);
    state.store.upsert_profile(&profile).await?;

    tracing::info!(user_id = %user.user_id, "Profile created");
    Ok(Json(profile))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Profile>> {
    let profile = state
        .store
        .get_profile(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user.user_id)))?;
    Ok(Json(profile))
}
