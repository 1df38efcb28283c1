// SPDX-License-Identifier: MIT

//! Points-history entries: the append-only ledger shared by profiles
//! (global points) and participants (challenge-scoped points).

use crate::dates::CalendarDay;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What kind of event produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Missed,
    Joined,
    Created,
    Left,
}

/// One entry in a points history.
///
/// `points` is the owner's *resulting* total after the event, so the last
/// entry of a well-formed history always equals the stored running total.
/// In correct operation there is at most one entry per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub date: CalendarDay,
    pub points: i64,
    pub task_status: TaskStatus,
}

impl PointsEntry {
    pub fn new(date: CalendarDay, points: i64, task_status: TaskStatus) -> Self {
        Self {
            date,
            points,
            task_status,
        }
    }
}

/// True if the history already has an entry for `date`.
///
/// This is the idempotency guard: every ledger mutation for a day is
/// preconditioned on it, so re-running the scanner or replaying a check-in
/// cannot append a second entry for the same day.
pub fn has_entry_for(history: &[PointsEntry], date: CalendarDay) -> bool {
    history.iter().any(|e| e.date == date)
}

/// Result of filtering duplicate `missed` entries out of a history.
#[derive(Debug, Clone)]
pub struct DedupeResult {
    /// The filtered history, original append order preserved.
    pub entries: Vec<PointsEntry>,
    /// Number of duplicate `missed` entries dropped.
    pub removed: usize,
}

/// Drop duplicate `missed` entries, keeping the first occurrence per date.
///
/// Duplicates are always appended *after* the original (a scanner re-run
/// that raced the idempotency guard), so the first occurrence is the
/// authoritative one and later ones are spurious. Entries with other
/// statuses are never touched, even when they share a date with a miss.
pub fn dedupe_missed(history: &[PointsEntry]) -> DedupeResult {
    let mut seen_missed: HashSet<CalendarDay> = HashSet::new();
    let mut entries = Vec::with_capacity(history.len());
    let mut removed = 0;

    for entry in history {
        if entry.task_status == TaskStatus::Missed && !seen_missed.insert(entry.date) {
            removed += 1;
            continue;
        }
        entries.push(entry.clone());
    }

    DedupeResult { entries, removed }
}

/// The corrected running total for a repaired history: the `points` value
/// of the chronologically last entry.
pub fn corrected_points(entries: &[PointsEntry]) -> Option<i64> {
    entries.iter().max_by_key(|e| e.date).map(|e| e.points)
}
