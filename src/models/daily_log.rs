// SPDX-License-Identifier: MIT

//! Daily log model: one row per (challenge, user, day), the source of
//! truth the missed-day scanner consults.

use crate::dates::CalendarDay;
use serde::{Deserialize, Serialize};

/// Outcome recorded in a daily log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Completed,
    Missed,
}

/// Check-in coordinates attached to a completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One day's outcome for one participant.
///
/// Stored at `daily_logs/{challenge_id}_{user_id}_{date}` so existence of
/// the document is itself the "day already accounted for" check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLog {
    pub challenge_id: String,
    pub user_id: String,
    pub date: CalendarDay,
    pub status: LogStatus,
    /// Blob-store URL of the proof image (completions only)
    pub proof_url: Option<String>,
    pub location: Option<GeoPoint>,
    pub note: Option<String>,
    /// When the log was written (ISO 8601)
    pub created_at: String,
}

impl DailyLog {
    /// Document ID for the (challenge, user, date) triple.
    pub fn doc_id(challenge_id: &str, user_id: &str, date: CalendarDay) -> String {
        format!("{}_{}_{}", challenge_id, user_id, date)
    }
}
