// SPDX-License-Identifier: MIT

//! The authoritative points/streak ledger.
//!
//! Every point-affecting event in the system (check-in completion, missed
//! day, join, leave) goes through these functions, whether it originates
//! from the check-in handler, the missed-day scanner, or the repair tool.
//! They are pure: they mutate in-memory documents and report what
//! happened. Atomicity and persistence are the store's job — see
//! [`crate::db::LedgerStore::apply_event`], which runs these inside a
//! conditional transaction keyed by `(challenge, user, date)`.
//!
//! Idempotency contract: completion and miss are preconditioned on the
//! participant history having no entry for the day. A duplicate attempt
//! reports `false`/`None` and mutates nothing.

use crate::dates::CalendarDay;
use crate::models::history::{self, PointsEntry, TaskStatus};
use crate::models::participant::ChallengeParticipant;
use crate::models::profile::Profile;

/// Points credited when a profile or participant is created.
pub const STARTING_POINTS: i64 = 500;
/// Points deducted for a missed scheduled day.
pub const MISS_PENALTY: i64 = 100;
/// Bonus granted every [`STREAK_BONUS_INTERVAL`]th consecutive completion.
pub const STREAK_BONUS: i64 = 100;
/// Streak length between bonuses.
pub const STREAK_BONUS_INTERVAL: u32 = 3;

/// Whether a participant joined on their own or as the challenge creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Joined,
    Created,
}

impl JoinKind {
    fn task_status(self) -> TaskStatus {
        match self {
            JoinKind::Joined => TaskStatus::Joined,
            JoinKind::Created => TaskStatus::Created,
        }
    }
}

/// Outcome of a successfully recorded completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionResult {
    pub new_streak: u32,
    /// Bonus points granted (0 when the streak is not at a bonus step).
    pub bonus: i64,
}

/// Record a completed day.
///
/// Returns `None` without mutating anything if the participant history
/// already has an entry for `date` (idempotent duplicate).
pub fn record_completion(
    participant: &mut ChallengeParticipant,
    profile: &mut Profile,
    date: CalendarDay,
    now: &str,
) -> Option<CompletionResult> {
    if history::has_entry_for(&participant.points_history, date) {
        return None;
    }

    let new_streak = participant.streak_current + 1;
    let bonus = if new_streak % STREAK_BONUS_INTERVAL == 0 {
        STREAK_BONUS
    } else {
        0
    };

    participant.current_points += bonus;
    participant.streak_current = new_streak;
    participant.streak_best = participant.streak_best.max(new_streak);
    participant.points_history.push(PointsEntry::new(
        date,
        participant.current_points,
        TaskStatus::Completed,
    ));
    participant.updated_at = now.to_string();

    if bonus > 0 {
        profile.current_points += bonus;
        profile.total_earned += bonus;
        profile.points_history.push(PointsEntry::new(
            date,
            profile.current_points,
            TaskStatus::Completed,
        ));
        profile.updated_at = now.to_string();
    }

    Some(CompletionResult { new_streak, bonus })
}

/// Record a missed day.
///
/// Deducts `penalty` from the participant and the profile (the profile
/// total is floored at 0; `total_lost` always grows by the full penalty)
/// and resets the current streak. Returns `false` without mutating
/// anything if the participant history already has an entry for `date`.
pub fn record_miss(
    participant: &mut ChallengeParticipant,
    profile: &mut Profile,
    date: CalendarDay,
    penalty: i64,
    now: &str,
) -> bool {
    if history::has_entry_for(&participant.points_history, date) {
        return false;
    }

    participant.current_points -= penalty;
    participant.streak_current = 0;
    participant.points_history.push(PointsEntry::new(
        date,
        participant.current_points,
        TaskStatus::Missed,
    ));
    participant.updated_at = now.to_string();

    profile.current_points = (profile.current_points - penalty).max(0);
    profile.total_lost += penalty;
    profile.points_history.push(PointsEntry::new(
        date,
        profile.current_points,
        TaskStatus::Missed,
    ));
    profile.updated_at = now.to_string();

    true
}

/// Build the participant row for a fresh join and credit the profile.
///
/// The participant starts with [`STARTING_POINTS`] and a seed history
/// entry; the profile is credited the same amount.
pub fn record_join(
    challenge_id: &str,
    user_id: &str,
    kind: JoinKind,
    profile: &mut Profile,
    date: CalendarDay,
    now: &str,
) -> ChallengeParticipant {
    let status = kind.task_status();

    profile.current_points += STARTING_POINTS;
    profile.total_earned += STARTING_POINTS;
    profile
        .points_history
        .push(PointsEntry::new(date, profile.current_points, status));
    profile.updated_at = now.to_string();

    ChallengeParticipant {
        challenge_id: challenge_id.to_string(),
        user_id: user_id.to_string(),
        current_points: STARTING_POINTS,
        streak_current: 0,
        streak_best: 0,
        is_active: true,
        joined_date: date,
        points_history: vec![PointsEntry::new(date, STARTING_POINTS, status)],
        updated_at: now.to_string(),
    }
}

/// Record leaving a challenge.
///
/// The profile gives back the participant's challenge-scoped points
/// (debit floored at 0 on both sides: a negative participant balance does
/// not turn into a credit) and the participant is deactivated, keeping
/// its history.
pub fn record_leave(
    participant: &mut ChallengeParticipant,
    profile: &mut Profile,
    date: CalendarDay,
    now: &str,
) {
    let debit = participant.current_points.max(0);
    profile.current_points = (profile.current_points - debit).max(0);
    profile
        .points_history
        .push(PointsEntry::new(date, profile.current_points, TaskStatus::Left));
    profile.updated_at = now.to_string();

    participant.is_active = false;
    participant.updated_at = now.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2025-12-01T08:00:00Z";

    fn day(s: &str) -> CalendarDay {
        s.parse().unwrap()
    }

    fn fresh() -> (ChallengeParticipant, Profile) {
        let mut profile = Profile::new("u1", "Test User", None, NOW);
        let participant = record_join("c1", "u1", JoinKind::Joined, &mut profile, day("2025-12-01"), NOW);
        (participant, profile)
    }

    #[test]
    fn test_join_seeds_participant_and_credits_profile() {
        let (participant, profile) = fresh();

        assert_eq!(participant.current_points, 500);
        assert_eq!(participant.streak_current, 0);
        assert!(participant.is_active);
        assert_eq!(participant.points_history.len(), 1);
        assert_eq!(participant.points_history[0].points, 500);
        assert_eq!(participant.points_history[0].task_status, TaskStatus::Joined);

        // Profile started at 500 and gained 500 for joining
        assert_eq!(profile.current_points, 1000);
        assert_eq!(profile.total_earned, 1000);
        assert_eq!(profile.points_history.len(), 1);
    }

    #[test]
    fn test_created_kind_tags_entries() {
        let mut profile = Profile::new("u1", "Test User", None, NOW);
        let participant =
            record_join("c1", "u1", JoinKind::Created, &mut profile, day("2025-12-01"), NOW);
        assert_eq!(participant.points_history[0].task_status, TaskStatus::Created);
        assert_eq!(profile.points_history[0].task_status, TaskStatus::Created);
    }

    #[test]
    fn test_bonus_granted_exactly_on_every_third_completion() {
        let (mut participant, mut profile) = fresh();

        let mut d = day("2025-12-02");
        for completion in 1u32..=9 {
            let result = record_completion(&mut participant, &mut profile, d, NOW)
                .expect("distinct days never skip");
            let expect_bonus = completion % 3 == 0;
            assert_eq!(
                result.bonus > 0,
                expect_bonus,
                "completion {} bonus mismatch",
                completion
            );
            assert_eq!(result.new_streak, completion);
            d = d.succ();
        }

        // Three bonuses of 100 on top of the starting 500
        assert_eq!(participant.current_points, 800);
        assert_eq!(participant.streak_current, 9);
        assert_eq!(participant.streak_best, 9);
    }

    #[test]
    fn test_completion_without_bonus_leaves_profile_untouched() {
        let (mut participant, mut profile) = fresh();
        let before = profile.points_history.len();

        record_completion(&mut participant, &mut profile, day("2025-12-02"), NOW).unwrap();

        assert_eq!(profile.points_history.len(), before);
        assert_eq!(profile.current_points, 1000);
        // Participant still got a history entry at its unchanged total
        let last = participant.points_history.last().unwrap();
        assert_eq!(last.points, 500);
        assert_eq!(last.task_status, TaskStatus::Completed);
    }

    #[test]
    fn test_completion_is_idempotent_per_day() {
        let (mut participant, mut profile) = fresh();
        let d = day("2025-12-02");

        assert!(record_completion(&mut participant, &mut profile, d, NOW).is_some());
        assert!(record_completion(&mut participant, &mut profile, d, NOW).is_none());

        assert_eq!(participant.streak_current, 1);
        // join entry + one completion entry
        assert_eq!(participant.points_history.len(), 2);
    }

    #[test]
    fn test_miss_resets_streak_but_not_best() {
        let (mut participant, mut profile) = fresh();
        record_completion(&mut participant, &mut profile, day("2025-12-02"), NOW);
        record_completion(&mut participant, &mut profile, day("2025-12-03"), NOW);
        assert_eq!(participant.streak_best, 2);

        assert!(record_miss(
            &mut participant,
            &mut profile,
            day("2025-12-04"),
            MISS_PENALTY,
            NOW
        ));

        assert_eq!(participant.streak_current, 0);
        assert_eq!(participant.streak_best, 2);
        assert_eq!(participant.current_points, 400);
        assert_eq!(profile.current_points, 900);
        assert_eq!(profile.total_lost, 100);
    }

    #[test]
    fn test_miss_is_idempotent_per_day() {
        let (mut participant, mut profile) = fresh();
        let d = day("2025-12-02");

        assert!(record_miss(&mut participant, &mut profile, d, MISS_PENALTY, NOW));
        assert!(!record_miss(&mut participant, &mut profile, d, MISS_PENALTY, NOW));

        assert_eq!(participant.current_points, 400);
        assert_eq!(profile.total_lost, 100);
        let missed_entries = participant
            .points_history
            .iter()
            .filter(|e| e.task_status == TaskStatus::Missed)
            .count();
        assert_eq!(missed_entries, 1);
    }

    #[test]
    fn test_profile_points_floor_at_zero() {
        let (mut participant, mut profile) = fresh();
        profile.current_points = 40;

        record_miss(&mut participant, &mut profile, day("2025-12-02"), MISS_PENALTY, NOW);

        assert_eq!(profile.current_points, 0);
        // total_lost still grows by the full penalty
        assert_eq!(profile.total_lost, 100);
        // Participant points are not floored
        assert_eq!(participant.current_points, 400);
    }

    #[test]
    fn test_leave_debits_profile_and_deactivates() {
        let (mut participant, mut profile) = fresh();

        record_leave(&mut participant, &mut profile, day("2025-12-05"), NOW);

        assert!(!participant.is_active);
        assert_eq!(profile.current_points, 500); // 1000 - 500
        let last = profile.points_history.last().unwrap();
        assert_eq!(last.task_status, TaskStatus::Left);
    }

    #[test]
    fn test_leave_with_negative_participant_balance_debits_nothing() {
        let (mut participant, mut profile) = fresh();
        participant.current_points = -200;

        record_leave(&mut participant, &mut profile, day("2025-12-05"), NOW);

        assert_eq!(profile.current_points, 1000);
        assert!(!participant.is_active);
    }

    #[test]
    fn test_end_to_end_december_scenario() {
        // Join 12-01 (500), complete 12-02/12-03, miss 12-04 (-100 -> 400),
        // complete 12-05/12-06/12-07 (streak 3 on 12-07, +100 -> 500).
        let (mut participant, mut profile) = fresh();

        record_completion(&mut participant, &mut profile, day("2025-12-02"), NOW).unwrap();
        let r = record_completion(&mut participant, &mut profile, day("2025-12-03"), NOW).unwrap();
        assert_eq!(r.new_streak, 2);
        assert_eq!(r.bonus, 0);

        record_miss(&mut participant, &mut profile, day("2025-12-04"), MISS_PENALTY, NOW);
        assert_eq!(participant.current_points, 400);
        let miss_entry = participant.points_history.last().unwrap();
        assert_eq!(miss_entry.date, day("2025-12-04"));
        assert_eq!(miss_entry.points, 400);
        assert_eq!(miss_entry.task_status, TaskStatus::Missed);

        record_completion(&mut participant, &mut profile, day("2025-12-05"), NOW).unwrap();
        record_completion(&mut participant, &mut profile, day("2025-12-06"), NOW).unwrap();
        let r = record_completion(&mut participant, &mut profile, day("2025-12-07"), NOW).unwrap();
        assert_eq!(r.bonus, 100);

        assert_eq!(participant.current_points, 500);
        assert_eq!(participant.streak_current, 3);
        assert_eq!(participant.streak_best, 3);
        let last = participant.points_history.last().unwrap();
        assert_eq!(last.date, day("2025-12-07"));
        assert_eq!(last.points, 500);
        assert_eq!(last.task_status, TaskStatus::Completed);
    }
}
