// SPDX-License-Identifier: MIT

//! Challenge participant model: the join entity between a user and a
//! challenge, holding challenge-scoped points and streaks.

use crate::dates::CalendarDay;
use crate::models::history::PointsEntry;
use serde::{Deserialize, Serialize};

/// One user's membership in one challenge.
///
/// Stored at `challenge_participants/{challenge_id}_{user_id}`. Leaving a
/// challenge sets `is_active = false`; the row is never deleted, so a
/// returning user keeps their history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeParticipant {
    pub challenge_id: String,
    pub user_id: String,
    /// Challenge-scoped point total (independent of the profile's global
    /// total, may go negative)
    pub current_points: i64,
    /// Consecutive scheduled days completed; resets to 0 on a miss
    pub streak_current: u32,
    /// Best streak ever reached; only grows
    pub streak_best: u32,
    pub is_active: bool,
    /// Day the user joined (misses before this day are never charged)
    pub joined_date: CalendarDay,
    /// Append-only ledger of challenge-scoped point events
    #[serde(default)]
    pub points_history: Vec<PointsEntry>,
    /// Last mutation timestamp (ISO 8601)
    pub updated_at: String,
}

impl ChallengeParticipant {
    /// Document ID for the (challenge, user) pair.
    pub fn doc_id(challenge_id: &str, user_id: &str) -> String {
        format!("{}_{}", challenge_id, user_id)
    }
}
