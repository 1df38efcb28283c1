// SPDX-License-Identifier: MIT

//! Challenge model: a time-boxed accountability challenge.

use crate::dates::{parse_window_minutes, CalendarDay};
use geo::{Distance, Haversine, Point};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of the random join code.
pub const JOIN_CODE_LEN: usize = 6;

/// Alphabet for join codes. Excludes easily-confused characters (0/O, 1/I).
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Challenge lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Active,
    Completed,
    Cancelled,
}

/// A circular geofence a check-in must fall inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub lat: f64,
    pub lng: f64,
    /// Radius in meters
    pub radius_meters: f64,
}

impl GeoFence {
    /// True if the given coordinates are within this fence.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        let center = Point::new(self.lng, self.lat);
        let probe = Point::new(lng, lat);
        Haversine.distance(center, probe) <= self.radius_meters
    }
}

/// Challenge stored in Firestore, keyed by challenge ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Challenge ID (also used as document ID)
    pub challenge_id: String,
    /// User ID of the creator
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// First day a completion is required (inclusive)
    pub start_date: CalendarDay,
    /// Last day a completion is required (inclusive)
    pub end_date: CalendarDay,
    /// Daily check-in window start ("HH:MM"), None = any time
    pub time_window_start: Option<String>,
    /// Daily check-in window end ("HH:MM")
    pub time_window_end: Option<String>,
    /// Weekday indices (0 = Sunday) exempt from the completion requirement
    #[serde(default)]
    pub rest_days: Vec<u8>,
    /// Geofences; empty = no location requirement
    #[serde(default)]
    pub locations: Vec<GeoFence>,
    /// 6-character code other users join with
    pub join_code: String,
    pub status: ChallengeStatus,
    /// When the challenge was created (ISO 8601)
    pub created_at: String,
}

impl Challenge {
    /// True if `day` falls within the challenge's inclusive date range.
    pub fn covers(&self, day: CalendarDay) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// True if `day`'s weekday is one of the challenge's rest days.
    pub fn is_rest_day(&self, day: CalendarDay) -> bool {
        self.rest_days.contains(&day.weekday_index())
    }

    /// True if a check-in at `minutes_since_midnight` falls inside the
    /// configured daily window. A window with start > end spans midnight.
    /// Unset or unparseable bounds impose no restriction.
    pub fn within_time_window(&self, minutes_since_midnight: u16) -> bool {
        let (start, end) = match (
            self.time_window_start.as_deref().and_then(parse_window_minutes),
            self.time_window_end.as_deref().and_then(parse_window_minutes),
        ) {
            (Some(s), Some(e)) => (s, e),
            _ => return true,
        };

        if start <= end {
            start <= minutes_since_midnight && minutes_since_midnight <= end
        } else {
            minutes_since_midnight >= start || minutes_since_midnight <= end
        }
    }

    /// True if the coordinates satisfy the geofence requirement: inside at
    /// least one fence, or no fences configured.
    pub fn within_geofence(&self, lat: f64, lng: f64) -> bool {
        self.locations.is_empty() || self.locations.iter().any(|f| f.contains(lat, lng))
    }

    /// True if the challenge requires location proof on check-in.
    pub fn requires_location(&self) -> bool {
        !self.locations.is_empty()
    }
}

/// Generate a random join code.
pub fn generate_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
            JOIN_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_challenge() -> Challenge {
        Challenge {
            challenge_id: "c1".to_string(),
            owner_id: "u1".to_string(),
            title: "Morning runs".to_string(),
            description: "Run every day".to_string(),
            start_date: "2025-01-01".parse().unwrap(),
            end_date: "2025-01-31".parse().unwrap(),
            time_window_start: None,
            time_window_end: None,
            rest_days: vec![0], // Sundays off
            locations: vec![],
            join_code: "ABC234".to_string(),
            status: ChallengeStatus::Active,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_covers_is_inclusive() {
        let c = test_challenge();
        assert!(c.covers("2025-01-01".parse().unwrap()));
        assert!(c.covers("2025-01-31".parse().unwrap()));
        assert!(!c.covers("2024-12-31".parse().unwrap()));
        assert!(!c.covers("2025-02-01".parse().unwrap()));
    }

    #[test]
    fn test_rest_day() {
        let c = test_challenge();
        // 2025-01-05 is a Sunday
        assert!(c.is_rest_day("2025-01-05".parse().unwrap()));
        assert!(!c.is_rest_day("2025-01-06".parse().unwrap()));
    }

    #[test]
    fn test_time_window() {
        let mut c = test_challenge();
        assert!(c.within_time_window(0)); // no window configured

        c.time_window_start = Some("06:00".to_string());
        c.time_window_end = Some("09:00".to_string());
        assert!(c.within_time_window(6 * 60));
        assert!(c.within_time_window(9 * 60));
        assert!(!c.within_time_window(5 * 60 + 59));
        assert!(!c.within_time_window(12 * 60));
    }

    #[test]
    fn test_time_window_spanning_midnight() {
        let mut c = test_challenge();
        c.time_window_start = Some("22:00".to_string());
        c.time_window_end = Some("02:00".to_string());
        assert!(c.within_time_window(23 * 60));
        assert!(c.within_time_window(60));
        assert!(!c.within_time_window(12 * 60));
    }

    #[test]
    fn test_geofence() {
        let mut c = test_challenge();
        assert!(c.within_geofence(0.0, 0.0)); // no fences

        c.locations = vec![GeoFence {
            lat: 37.7749,
            lng: -122.4194,
            radius_meters: 200.0,
        }];
        // At the center
        assert!(c.within_geofence(37.7749, -122.4194));
        // ~15 km away (San Jose direction), well outside 200m
        assert!(!c.within_geofence(37.6391, -122.4100));
    }

    #[test]
    fn test_join_code_shape() {
        let code = generate_join_code();
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(code
            .bytes()
            .all(|b| JOIN_CODE_ALPHABET.contains(&b)));
    }
}
