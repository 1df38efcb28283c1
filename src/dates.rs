// SPDX-License-Identifier: MIT

//! Calendar-day handling.
//!
//! All point-affecting events are keyed by calendar day in the server's
//! local timezone, stored as zero-padded `YYYY-MM-DD` strings so that
//! lexicographic order equals chronological order. `CalendarDay` wraps a
//! `NaiveDate` and serializes to exactly that form.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day (`YYYY-MM-DD`), the grain of the points ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today in the server's local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// The previous calendar day.
    pub fn pred(self) -> Self {
        Self(self.0.pred_opt().expect("date underflow"))
    }

    /// The next calendar day.
    pub fn succ(self) -> Self {
        Self(self.0.succ_opt().expect("date overflow"))
    }

    /// Weekday index with 0 = Sunday .. 6 = Saturday.
    ///
    /// Challenge `rest_days` use this convention (inherited from the
    /// client, where `Date.getDay()` numbers Sunday as 0).
    pub fn weekday_index(self) -> u8 {
        self.0.weekday().num_days_from_sunday() as u8
    }

    /// Short weekday label ("Sun" .. "Sat") for chart rows.
    pub fn weekday_label(self) -> &'static str {
        match self.weekday_index() {
            0 => "Sun",
            1 => "Mon",
            2 => "Tue",
            3 => "Wed",
            4 => "Thu",
            5 => "Fri",
            _ => "Sat",
        }
    }

    /// Inclusive iterator from `self` through `end`.
    ///
    /// Empty when `end` precedes `self`.
    pub fn iter_through(self, end: CalendarDay) -> DayRange {
        DayRange {
            next: self,
            end,
            done: end < self,
        }
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for CalendarDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DAY_FORMAT).map(Self)
    }
}

impl Serialize for CalendarDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive day-by-day iterator, see [`CalendarDay::iter_through`].
pub struct DayRange {
    next: CalendarDay,
    end: CalendarDay,
    done: bool,
}

impl Iterator for DayRange {
    type Item = CalendarDay;

    fn next(&mut self) -> Option<CalendarDay> {
        if self.done {
            return None;
        }
        let current = self.next;
        if current == self.end {
            self.done = true;
        } else {
            self.next = current.succ();
        }
        Some(current)
    }
}

/// Parse a daily time-window bound ("HH:MM") into minutes since midnight.
pub fn parse_window_minutes(s: &str) -> Option<u16> {
    let (h, m) = s.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}
