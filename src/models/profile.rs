// SPDX-License-Identifier: MIT

//! User profile model: global points across all challenges.

use crate::models::history::PointsEntry;
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore, keyed by user ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Auth user ID (also used as document ID)
    pub user_id: String,
    /// Display name shown to other participants
    pub display_name: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Global running point total (floored at 0)
    pub current_points: i64,
    /// Lifetime points earned (monotonically non-decreasing)
    pub total_earned: i64,
    /// Lifetime points lost (monotonically non-decreasing)
    pub total_lost: i64,
    /// Append-only ledger of point-affecting events
    #[serde(default)]
    pub points_history: Vec<PointsEntry>,
    /// When the profile was created (ISO 8601)
    pub created_at: String,
    /// Last mutation timestamp (ISO 8601)
    pub updated_at: String,
}

impl Profile {
    /// New profile as created on first sign-in: 500 starting points.
    pub fn new(user_id: &str, display_name: &str, email: Option<String>, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            email,
            current_points: crate::models::ledger::STARTING_POINTS,
            total_earned: crate::models::ledger::STARTING_POINTS,
            total_lost: 0,
            points_history: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}
