//! Consistency views derived from check-ins.
//!
//! All functions here are pure: output depends only on the check-ins passed
//! in and on the reference day, so callers simply recompute after each write.
//! - [`weekly_completion`]: per-day ratio of habits done for one week
//! - [`year_grid`]: calendar heat map, one column per week
//! - [`ConsistencySummary`]: headline numbers for a dashboard

use std::collections::{HashMap, HashSet};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::clock::DateKey;
use crate::model::{CheckIn, Habit};
use crate::streak::{best_streak, current_streak};

/// Default consistency-map window: 52 weeks.
pub const DEFAULT_WINDOW_DAYS: u32 = 364;

/// Largest consistency-map window: about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Highest intensity bucket of a grid cell.
pub const MAX_INTENSITY: u8 = 4;

/// How a single day went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Every habit was checked in.
    Completed,
    /// Some, not all.
    Partial,
    /// Nothing was checked in.
    Missed,
    /// The day has not happened yet.
    Future,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCompletion {
    pub date: DateKey,
    /// Distinct habits checked in on this day.
    pub checked_habits: usize,
    /// `checked_habits / habit_count` clamped to `[0, 1]`; `None` for future days.
    pub ratio: Option<f64>,
    pub status: DayStatus,
}

impl DayCompletion {
    pub fn is_future(&self) -> bool {
        self.status == DayStatus::Future
    }
}

/// Seven consecutive days starting at `week_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCompletion {
    pub week_start: DateKey,
    pub days: Vec<DayCompletion>,
}

impl WeeklyCompletion {
    /// Mean ratio over the days that already happened; `None` if none have.
    pub fn average(&self) -> Option<f64> {
        let elapsed: Vec<f64> = self.days.iter().filter_map(|d| d.ratio).collect();
        if elapsed.is_empty() {
            None
        } else {
            Some(elapsed.iter().sum::<f64>() / elapsed.len() as f64)
        }
    }

    pub fn completed_days(&self) -> usize {
        self.days
            .iter()
            .filter(|d| d.status == DayStatus::Completed)
            .count()
    }
}

/// Distinct habits checked in per day.
fn habits_per_day(check_ins: &[CheckIn]) -> HashMap<DateKey, HashSet<&str>> {
    let mut by_day: HashMap<DateKey, HashSet<&str>> = HashMap::new();
    for check_in in check_ins {
        by_day
            .entry(check_in.completed_at)
            .or_default()
            .insert(check_in.habit_id.as_str());
    }
    by_day
}

fn ratio(checked: usize, habit_count: usize) -> f64 {
    if habit_count == 0 {
        return 0.0;
    }
    (checked as f64 / habit_count as f64).clamp(0.0, 1.0)
}

fn status_for(checked: usize, habit_count: usize) -> DayStatus {
    if habit_count > 0 && checked >= habit_count {
        DayStatus::Completed
    } else if checked > 0 {
        DayStatus::Partial
    } else {
        DayStatus::Missed
    }
}

/// Completion ratio of a single day.
pub fn day_completion(check_ins: &[CheckIn], habit_count: usize, day: DateKey) -> f64 {
    let checked = check_ins
        .iter()
        .filter(|c| c.completed_at == day)
        .map(|c| c.habit_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    ratio(checked, habit_count)
}

/// Per-day completion for the 7 days starting at `week_start`.
///
/// Days after `today` are marked [`DayStatus::Future`] with no ratio so they
/// are never mistaken for missed days.
pub fn weekly_completion(
    check_ins: &[CheckIn],
    habit_count: usize,
    week_start: DateKey,
    today: DateKey,
) -> WeeklyCompletion {
    let by_day = habits_per_day(check_ins);

    let days = (0..7)
        .map(|offset| {
            let date = week_start.add_days(offset);
            let checked_habits = by_day.get(&date).map_or(0, HashSet::len);
            if date > today {
                DayCompletion {
                    date,
                    checked_habits,
                    ratio: None,
                    status: DayStatus::Future,
                }
            } else {
                DayCompletion {
                    date,
                    checked_habits,
                    ratio: Some(ratio(checked_habits, habit_count)),
                    status: status_for(checked_habits, habit_count),
                }
            }
        })
        .collect();

    WeeklyCompletion { week_start, days }
}

/// One day of the heat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub date: DateKey,
    /// Check-ins on this day across all habits; zero for future days.
    pub count: u32,
    pub is_future: bool,
    /// Count bucketed into `0..=MAX_INTENSITY`.
    pub intensity: u8,
}

/// Column at which a new month first appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLabel {
    pub year: i32,
    pub month: u32,
    pub column: usize,
}

/// Heat map: `weeks[column][row]`, rows ordered from the first weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearGrid {
    pub start: DateKey,
    pub end: DateKey,
    pub weeks: Vec<[GridCell; 7]>,
    pub month_labels: Vec<MonthLabel>,
    /// Check-ins that fall inside the grid.
    pub total_check_ins: u32,
}

impl YearGrid {
    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.weeks.iter().flat_map(|week| week.iter())
    }

    pub fn cell(&self, date: DateKey) -> Option<&GridCell> {
        self.cells().find(|cell| cell.date == date)
    }
}

fn intensity(count: u32) -> u8 {
    count.min(u32::from(MAX_INTENSITY)) as u8
}

/// Bucket check-ins per day over a window ending today.
///
/// The grid starts at `today - (window_days - 1)` rounded back to the
/// previous `first_weekday` and ends with the week that contains today, so
/// every column is a full week. Cells after today are flagged as future.
/// `window_days` is clamped to `1..=MAX_WINDOW_DAYS`.
pub fn year_grid(
    check_ins: &[CheckIn],
    today: DateKey,
    window_days: u32,
    first_weekday: Weekday,
) -> YearGrid {
    let window_days = window_days.clamp(1, MAX_WINDOW_DAYS);
    let start = today
        .add_days(-(i64::from(window_days) - 1))
        .start_of_week(first_weekday);
    let end = today.start_of_week(first_weekday).add_days(6);

    let mut counts: HashMap<DateKey, u32> = HashMap::new();
    for check_in in check_ins {
        *counts.entry(check_in.completed_at).or_default() += 1;
    }

    let mut weeks = Vec::new();
    let mut month_labels: Vec<MonthLabel> = Vec::new();
    let mut total_check_ins = 0;
    let mut week_start = start;

    while week_start <= end {
        let column = weeks.len();
        let week: [GridCell; 7] = std::array::from_fn(|row| {
            let date = week_start.add_days(row as i64);
            let is_future = date > today;
            let count = if is_future {
                0
            } else {
                counts.get(&date).copied().unwrap_or(0)
            };
            GridCell {
                date,
                count,
                is_future,
                intensity: intensity(count),
            }
        });

        for cell in &week {
            let is_new_month = month_labels
                .last()
                .map_or(true, |l| (l.year, l.month) != (cell.date.year(), cell.date.month()));
            if is_new_month {
                month_labels.push(MonthLabel {
                    year: cell.date.year(),
                    month: cell.date.month(),
                    column,
                });
            }
            total_check_ins += cell.count;
        }

        weeks.push(week);
        week_start = week_start.add_days(7);
    }

    YearGrid {
        start,
        end,
        weeks,
        month_labels,
        total_check_ins,
    }
}

/// Headline numbers for a user's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencySummary {
    pub total_check_ins: usize,
    pub today_checked: usize,
    pub today_total: usize,
    pub week_start: DateKey,
    /// Check-ins since the start of the current week.
    pub week_completed: usize,
    /// `habits * 7`.
    pub week_target: usize,
    /// `week_completed / week_target * 100`, zero without habits.
    pub week_percentage: f64,
    /// Longest current streak among the habits.
    pub current_streak: u32,
    /// Longest run ever recorded for any habit.
    pub best_streak: u32,
}

impl ConsistencySummary {
    pub fn compute(
        habits: &[Habit],
        check_ins: &[CheckIn],
        today: DateKey,
        first_weekday: Weekday,
    ) -> Self {
        let habit_ids: HashSet<&str> = habits.iter().map(|h| h.id.as_str()).collect();
        let relevant: Vec<&CheckIn> = check_ins
            .iter()
            .filter(|c| habit_ids.contains(c.habit_id.as_str()))
            .collect();

        let week_start = today.start_of_week(first_weekday);
        let today_checked = relevant
            .iter()
            .filter(|c| c.completed_at == today)
            .map(|c| c.habit_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let week_completed = relevant
            .iter()
            .filter(|c| c.completed_at >= week_start && c.completed_at <= today)
            .count();
        let week_target = habits.len() * 7;
        let week_percentage = if week_target == 0 {
            0.0
        } else {
            week_completed as f64 / week_target as f64 * 100.0
        };

        let mut current = 0;
        let mut best = 0;
        for habit in habits {
            let days: Vec<DateKey> = relevant
                .iter()
                .filter(|c| c.habit_id == habit.id)
                .map(|c| c.completed_at)
                .collect();
            current = current.max(current_streak(days.iter().copied(), today));
            best = best.max(best_streak(days));
        }

        Self {
            total_check_ins: relevant.len(),
            today_checked,
            today_total: habits.len(),
            week_start,
            week_completed,
            week_target,
            week_percentage,
            current_streak: current,
            best_streak: best,
        }
    }
}
