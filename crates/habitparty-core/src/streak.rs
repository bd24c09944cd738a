//! Consecutive-day streaks over a set of check-in days.
//!
//! A streak stays alive through the end of the day after the last check-in:
//! a habit checked in yesterday but not yet today still reports its full run.
//! A gap of two or more days before today resets the current streak to zero,
//! while [`best_streak`] keeps the all-time record.

use std::collections::BTreeSet;

use crate::clock::{days_between, DateKey};

/// Days before today that the most recent check-in may lag and still count.
pub const GRACE_DAYS: i64 = 1;

/// Current streak ending today or yesterday.
///
/// Duplicate days count once. Check-ins dated after `today` are ignored.
pub fn current_streak<I>(days: I, today: DateKey) -> u32
where
    I: IntoIterator<Item = DateKey>,
{
    let unique: BTreeSet<DateKey> = days.into_iter().filter(|d| *d <= today).collect();

    let mut descending = unique.iter().rev();
    let Some(&last) = descending.next() else {
        return 0;
    };
    if days_between(last, today) > GRACE_DAYS {
        return 0;
    }

    let mut streak = 1;
    let mut previous = last;
    for &day in descending {
        if day != previous.pred() {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}

/// Longest run of consecutive days anywhere in the history.
pub fn best_streak<I>(days: I) -> u32
where
    I: IntoIterator<Item = DateKey>,
{
    let unique: BTreeSet<DateKey> = days.into_iter().collect();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<DateKey> = None;
    for &day in &unique {
        run = match previous {
            Some(prev) if day == prev.succ() => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Current and best streak computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
}

impl StreakSummary {
    pub fn from_days<I>(days: I, today: DateKey) -> Self
    where
        I: IntoIterator<Item = DateKey>,
    {
        let days: Vec<DateKey> = days.into_iter().collect();
        Self {
            current: current_streak(days.iter().copied(), today),
            best: best_streak(days),
        }
    }
}
