// SPDX-License-Identifier: MIT

//! History projection: the chart read path.
//!
//! Histories are sparse (one entry per point-affecting day); charts want
//! one row per calendar day. This walks the continuous day range and
//! carries each participant's last known total forward, emitting `null`
//! for days before a user joined so the chart renders a gap instead of a
//! zero.

use crate::dates::CalendarDay;
use crate::models::{Challenge, ChallengeParticipant};
use serde::Serialize;
use std::collections::BTreeMap;

/// One chart row: a calendar day plus each participant's running total.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineRow {
    pub date: CalendarDay,
    /// Short weekday label ("Mon", "Tue", ...)
    pub name: &'static str,
    /// Running total per user ID; `null` before the user joined
    #[serde(flatten)]
    pub points: BTreeMap<String, Option<i64>>,
}

/// Project sparse histories into a dense day-by-day timeline.
///
/// Covers every day from the earliest of (challenge start, earliest
/// history entry) through today (or the challenge end if earlier). A
/// total function of its input: no day in the range is skipped. An empty
/// range produces a single fallback row at `today` with each
/// participant's stored total.
pub fn project_timeline(
    challenge: &Challenge,
    participants: &[ChallengeParticipant],
    today: CalendarDay,
) -> Vec<TimelineRow> {
    // Per-user date -> points lookup; a later entry for the same date wins
    let mut by_user: BTreeMap<&str, BTreeMap<CalendarDay, i64>> = BTreeMap::new();
    let mut earliest_entry: Option<CalendarDay> = None;

    for participant in participants {
        let dates = by_user.entry(participant.user_id.as_str()).or_default();
        for entry in &participant.points_history {
            dates.insert(entry.date, entry.points);
            earliest_entry = Some(match earliest_entry {
                Some(d) => d.min(entry.date),
                None => entry.date,
            });
        }
    }

    let range_start = match earliest_entry {
        Some(d) => d.min(challenge.start_date),
        None => challenge.start_date,
    };
    let range_end = today.min(challenge.end_date);

    if range_start > range_end {
        // Nothing chartable yet: one fallback row with stored totals
        let points = participants
            .iter()
            .map(|p| (p.user_id.clone(), Some(p.current_points)))
            .collect();
        return vec![TimelineRow {
            date: today,
            name: today.weekday_label(),
            points,
        }];
    }

    let mut last_known: BTreeMap<&str, Option<i64>> =
        by_user.keys().map(|user| (*user, None)).collect();
    let mut rows = Vec::new();

    for day in range_start.iter_through(range_end) {
        for (user, dates) in &by_user {
            if let Some(points) = dates.get(&day) {
                last_known.insert(*user, Some(*points));
            }
        }
        rows.push(TimelineRow {
            date: day,
            name: day.weekday_label(),
            points: last_known
                .iter()
                .map(|(user, points)| (user.to_string(), *points))
                .collect(),
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::history::PointsEntry;
    use crate::models::{ChallengeStatus, TaskStatus};

    fn day(s: &str) -> CalendarDay {
        s.parse().unwrap()
    }

    fn test_challenge(start: &str, end: &str) -> Challenge {
        Challenge {
            challenge_id: "c1".to_string(),
            owner_id: "u1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            start_date: day(start),
            end_date: day(end),
            time_window_start: None,
            time_window_end: None,
            rest_days: vec![],
            locations: vec![],
            join_code: "ABC234".to_string(),
            status: ChallengeStatus::Active,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn participant(user_id: &str, joined: &str, entries: &[(&str, i64)]) -> ChallengeParticipant {
        ChallengeParticipant {
            challenge_id: "c1".to_string(),
            user_id: user_id.to_string(),
            current_points: entries.last().map(|(_, p)| *p).unwrap_or(500),
            streak_current: 0,
            streak_best: 0,
            is_active: true,
            joined_date: day(joined),
            points_history: entries
                .iter()
                .map(|(d, p)| PointsEntry::new(day(d), *p, TaskStatus::Completed))
                .collect(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_projection_density_and_carry_forward() {
        let challenge = test_challenge("2025-01-01", "2025-01-31");
        let p = participant("u1", "2025-01-01", &[("2025-01-01", 500), ("2025-01-04", 400)]);

        let rows = project_timeline(&challenge, &[p], day("2025-01-05"));

        let expected = [
            ("2025-01-01", Some(500)),
            ("2025-01-02", Some(500)),
            ("2025-01-03", Some(500)),
            ("2025-01-04", Some(400)),
            ("2025-01-05", Some(400)),
        ];
        assert_eq!(rows.len(), expected.len());
        for (row, (date, points)) in rows.iter().zip(expected) {
            assert_eq!(row.date, day(date));
            assert_eq!(row.points.get("u1"), Some(points).as_ref());
        }
    }

    #[test]
    fn test_projection_null_before_join() {
        let challenge = test_challenge("2025-01-01", "2025-01-31");
        let early = participant("u1", "2025-01-01", &[("2025-01-01", 500)]);
        let late = participant("u2", "2025-01-03", &[("2025-01-03", 500)]);

        let rows = project_timeline(&challenge, &[early, late], day("2025-01-04"));

        assert_eq!(rows.len(), 4);
        // u2 has no value until their join entry on 01-03
        assert_eq!(rows[0].points.get("u2"), Some(&None));
        assert_eq!(rows[1].points.get("u2"), Some(&None));
        assert_eq!(rows[2].points.get("u2"), Some(&Some(500)));
        assert_eq!(rows[3].points.get("u2"), Some(&Some(500)));
        // u1 present throughout
        assert!(rows.iter().all(|r| r.points.get("u1") == Some(&Some(500))));
    }

    #[test]
    fn test_projection_clamps_to_challenge_end() {
        let challenge = test_challenge("2025-01-01", "2025-01-03");
        let p = participant("u1", "2025-01-01", &[("2025-01-01", 500)]);

        let rows = project_timeline(&challenge, &[p], day("2025-01-10"));

        assert_eq!(rows.len(), 3);
        assert_eq!(rows.last().unwrap().date, day("2025-01-03"));
    }

    #[test]
    fn test_projection_includes_pre_start_entries() {
        // A join entry before the challenge start widens the range
        let challenge = test_challenge("2025-01-03", "2025-01-31");
        let p = participant("u1", "2025-01-01", &[("2025-01-01", 500)]);

        let rows = project_timeline(&challenge, &[p], day("2025-01-03"));
        assert_eq!(rows.first().unwrap().date, day("2025-01-01"));
    }

    #[test]
    fn test_projection_empty_range_fallback_row() {
        // Challenge starts in the future, no history
        let challenge = test_challenge("2025-02-01", "2025-02-28");
        let p = participant("u1", "2025-01-15", &[]);

        let rows = project_timeline(&challenge, &[p], day("2025-01-15"));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, day("2025-01-15"));
        assert_eq!(rows[0].points.get("u1"), Some(&Some(500)));
    }

    #[test]
    fn test_projection_weekday_labels() {
        let challenge = test_challenge("2025-01-05", "2025-01-06");
        let p = participant("u1", "2025-01-05", &[("2025-01-05", 500)]);

        let rows = project_timeline(&challenge, &[p], day("2025-01-06"));
        assert_eq!(rows[0].name, "Sun");
        assert_eq!(rows[1].name, "Mon");
    }
}
