//! Habits and their daily check-ins.
//!
//! [`HabitTracker`] owns the write path for habits and check-ins and the read
//! projections built on top of them. Checking in twice on the same day is an
//! expected race (two devices, a double tap) and reports
//! [`CheckInOutcome::AlreadyCheckedIn`] instead of failing.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, DateKey};
use crate::consistency::{self, ConsistencySummary, WeeklyCompletion, YearGrid};
use crate::error::{Result, ValidationError};
use crate::model::{new_id, CheckIn, Habit};
use crate::storage::Store;
use crate::streak::{self, StreakSummary};

/// Result of [`HabitTracker::check_in`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    Created(CheckIn),
    /// A check-in for this habit and day already existed; nothing was written.
    AlreadyCheckedIn,
}

impl CheckInOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, CheckInOutcome::Created(_))
    }
}

/// A habit with today's state, as shown in a daily list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStatus {
    pub habit: Habit,
    pub checked_today: bool,
    pub streak: StreakSummary,
}

pub struct HabitTracker<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> HabitTracker<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create a habit for `owner_id`.
    ///
    /// # Errors
    /// Validation error for an empty name; store errors otherwise.
    pub fn add_habit(
        &self,
        owner_id: &str,
        name: &str,
        icon: &str,
        goal_minutes: u32,
    ) -> Result<Habit> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }
        let habit = Habit {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            icon: icon.trim().to_string(),
            goal_minutes,
            created_at: self.clock.now(),
        };
        self.store.insert_habit(&habit)?;
        info!(habit_id = %habit.id, owner_id, "habit created");
        Ok(habit)
    }

    pub fn list_habits(&self, owner_id: &str) -> Result<Vec<Habit>> {
        Ok(self.store.list_habits(owner_id)?)
    }

    /// Delete a habit together with its check-ins.
    ///
    /// Returns `false` if the habit was already gone.
    pub fn delete_habit(&self, owner_id: &str, habit_id: &str) -> Result<bool> {
        let Some(habit) = self.store.get_habit(habit_id)? else {
            return Ok(false);
        };
        Self::ensure_owner(&habit, owner_id)?;
        let removed = self.store.delete_habit(habit_id)?;
        info!(habit_id, "habit deleted");
        Ok(removed)
    }

    fn require_habit(&self, habit_id: &str) -> Result<Habit> {
        self.store
            .get_habit(habit_id)?
            .ok_or_else(|| ValidationError::not_found("habit", habit_id).into())
    }

    fn ensure_owner(habit: &Habit, user_id: &str) -> Result<()> {
        if habit.owner_id != user_id {
            return Err(ValidationError::Forbidden {
                entity: "habit",
                id: habit.id.clone(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Record that `user_id` completed their habit `habit_id` today.
    pub fn check_in(&self, user_id: &str, habit_id: &str) -> Result<CheckInOutcome> {
        let habit = self.require_habit(habit_id)?;
        Self::ensure_owner(&habit, user_id)?;
        let check_in = CheckIn {
            id: new_id(),
            owner_id: habit.owner_id,
            habit_id: habit.id,
            completed_at: self.clock.today(),
            created_at: self.clock.now(),
        };

        match self.store.insert_check_in(&check_in) {
            Ok(()) => {
                info!(habit_id, day = %check_in.completed_at, "checked in");
                Ok(CheckInOutcome::Created(check_in))
            }
            Err(e) if e.is_conflict() => {
                debug!(habit_id, day = %check_in.completed_at, "already checked in");
                Ok(CheckInOutcome::AlreadyCheckedIn)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove today's check-in for `habit_id`, if any.
    ///
    /// A habit that no longer exists has nothing to uncheck.
    pub fn uncheck(&self, user_id: &str, habit_id: &str) -> Result<()> {
        let today = self.clock.today();
        let Some(habit) = self.store.get_habit(habit_id)? else {
            debug!(habit_id, "uncheck of a missing habit");
            return Ok(());
        };
        Self::ensure_owner(&habit, user_id)?;
        if self.store.delete_check_in(habit_id, today)? {
            info!(habit_id, day = %today, "check-in removed");
        } else {
            debug!(habit_id, day = %today, "nothing to uncheck");
        }
        Ok(())
    }

    /// All check-ins of `owner_id`, newest day first.
    pub fn list_for(&self, owner_id: &str) -> Result<Vec<CheckIn>> {
        Ok(self.store.list_check_ins(owner_id)?)
    }

    pub fn is_checked_today(&self, habit_id: &str) -> Result<bool> {
        Ok(self
            .store
            .find_check_in(habit_id, self.clock.today())?
            .is_some())
    }

    fn habit_days(&self, habit_id: &str) -> Result<Vec<DateKey>> {
        Ok(self
            .store
            .list_habit_check_ins(habit_id)?
            .into_iter()
            .map(|c| c.completed_at)
            .collect())
    }

    /// Current streak of a habit, with one day of grace.
    pub fn streak(&self, habit_id: &str) -> Result<u32> {
        Ok(streak::current_streak(
            self.habit_days(habit_id)?,
            self.clock.today(),
        ))
    }

    /// All-time longest run of a habit.
    pub fn best_streak(&self, habit_id: &str) -> Result<u32> {
        Ok(streak::best_streak(self.habit_days(habit_id)?))
    }

    /// Every habit of `owner_id` with its check-in state and streaks.
    pub fn overview(&self, owner_id: &str) -> Result<Vec<HabitStatus>> {
        let today = self.clock.today();
        let check_ins = self.store.list_check_ins(owner_id)?;
        let habits = self.store.list_habits(owner_id)?;

        Ok(habits
            .into_iter()
            .map(|habit| {
                let days: Vec<DateKey> = check_ins
                    .iter()
                    .filter(|c| c.habit_id == habit.id)
                    .map(|c| c.completed_at)
                    .collect();
                HabitStatus {
                    checked_today: days.contains(&today),
                    streak: StreakSummary::from_days(days, today),
                    habit,
                }
            })
            .collect())
    }

    /// Completion of the current week for `owner_id`.
    pub fn weekly_completion(
        &self,
        owner_id: &str,
        first_weekday: Weekday,
    ) -> Result<WeeklyCompletion> {
        let today = self.clock.today();
        let habits = self.store.list_habits(owner_id)?;
        let check_ins = self.store.list_check_ins(owner_id)?;
        Ok(consistency::weekly_completion(
            &check_ins,
            habits.len(),
            today.start_of_week(first_weekday),
            today,
        ))
    }

    /// Consistency heat map for `owner_id` ending today.
    pub fn year_grid(
        &self,
        owner_id: &str,
        window_days: u32,
        first_weekday: Weekday,
    ) -> Result<YearGrid> {
        let check_ins = self.store.list_check_ins(owner_id)?;
        Ok(consistency::year_grid(
            &check_ins,
            self.clock.today(),
            window_days,
            first_weekday,
        ))
    }

    /// Ratio of habits completed on `day`.
    pub fn day_completion(&self, owner_id: &str, day: DateKey) -> Result<f64> {
        let habits = self.store.list_habits(owner_id)?;
        let check_ins = self.store.list_check_ins(owner_id)?;
        Ok(consistency::day_completion(&check_ins, habits.len(), day))
    }

    pub fn summary(&self, owner_id: &str, first_weekday: Weekday) -> Result<ConsistencySummary> {
        let habits = self.store.list_habits(owner_id)?;
        let check_ins = self.store.list_check_ins(owner_id)?;
        Ok(ConsistencySummary::compute(
            &habits,
            &check_ins,
            self.clock.today(),
            first_weekday,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::CoreError;
    use crate::storage::Database;

    fn setup() -> (Database, FixedClock) {
        (Database::open_memory().unwrap(), FixedClock::ymd(2024, 1, 8))
    }

    #[test]
    fn add_habit_trims_and_validates() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);

        let habit = tracker.add_habit("ana", "  Read  ", "book", 15).unwrap();
        assert_eq!(habit.name, "Read");

        let err = tracker.add_habit("ana", "   ", "book", 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyField("name"))
        ));
        assert_eq!(tracker.list_habits("ana").unwrap().len(), 1);
    }

    #[test]
    fn second_check_in_is_already_checked_in() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Read", "book", 0).unwrap();

        assert!(tracker.check_in("ana", &habit.id).unwrap().is_new());
        assert_eq!(
            tracker.check_in("ana", &habit.id).unwrap(),
            CheckInOutcome::AlreadyCheckedIn
        );
        assert_eq!(tracker.list_for("ana").unwrap().len(), 1);
    }

    #[test]
    fn check_in_then_uncheck_leaves_no_row() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Read", "book", 0).unwrap();

        tracker.check_in("ana", &habit.id).unwrap();
        assert!(tracker.is_checked_today(&habit.id).unwrap());
        tracker.uncheck("ana", &habit.id).unwrap();
        assert!(!tracker.is_checked_today(&habit.id).unwrap());
        // Unchecking again is a no-op
        tracker.uncheck("ana", &habit.id).unwrap();
        assert!(tracker.list_for("ana").unwrap().is_empty());
    }

    #[test]
    fn uncheck_only_touches_today() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Read", "book", 0).unwrap();

        tracker.check_in("ana", &habit.id).unwrap();
        clock.advance_days(1);
        tracker.uncheck("ana", &habit.id).unwrap();
        assert_eq!(tracker.list_for("ana").unwrap().len(), 1);
    }

    #[test]
    fn check_in_unknown_habit_is_rejected() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let err = tracker.check_in("ana", "missing").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn only_the_owner_checks_in_or_unchecks() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Read", "book", 0).unwrap();

        let err = tracker.check_in("bia", &habit.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Forbidden { .. })
        ));
        assert!(tracker.list_for("bia").unwrap().is_empty());
        assert!(!tracker.is_checked_today(&habit.id).unwrap());

        tracker.check_in("ana", &habit.id).unwrap();
        let err = tracker.uncheck("bia", &habit.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Forbidden { .. })
        ));
        assert!(tracker.is_checked_today(&habit.id).unwrap());

        // Missing habits have nothing to remove
        tracker.uncheck("ana", "missing").unwrap();
    }

    #[test]
    fn streaks_follow_the_clock() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Run", "shoe", 30).unwrap();

        for _ in 0..3 {
            tracker.check_in("ana", &habit.id).unwrap();
            clock.advance_days(1);
        }
        // Three days done, today not yet: grace keeps the run
        assert_eq!(tracker.streak(&habit.id).unwrap(), 3);
        clock.advance_days(1);
        assert_eq!(tracker.streak(&habit.id).unwrap(), 0);
        assert_eq!(tracker.best_streak(&habit.id).unwrap(), 3);
    }

    #[test]
    fn delete_habit_checks_owner_and_cascades() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let habit = tracker.add_habit("ana", "Read", "book", 0).unwrap();
        tracker.check_in("ana", &habit.id).unwrap();

        assert!(tracker.delete_habit("bia", &habit.id).unwrap_err().is_validation());
        assert!(tracker.delete_habit("ana", &habit.id).unwrap());
        assert!(!tracker.delete_habit("ana", &habit.id).unwrap());
        assert!(tracker.list_for("ana").unwrap().is_empty());
    }

    #[test]
    fn overview_reports_today_and_streaks() {
        let (db, clock) = setup();
        let tracker = HabitTracker::new(&db, &clock);
        let read = tracker.add_habit("ana", "Read", "book", 0).unwrap();
        let run = tracker.add_habit("ana", "Run", "shoe", 0).unwrap();

        tracker.check_in("ana", &read.id).unwrap();
        clock.advance_days(1);
        tracker.check_in("ana", &read.id).unwrap();
        tracker.check_in("ana", &run.id).unwrap();
        tracker.uncheck("ana", &run.id).unwrap();

        let overview = tracker.overview("ana").unwrap();
        assert_eq!(overview.len(), 2);
        let read_status = overview.iter().find(|s| s.habit.id == read.id).unwrap();
        assert!(read_status.checked_today);
        assert_eq!(read_status.streak, StreakSummary { current: 2, best: 2 });
        let run_status = overview.iter().find(|s| s.habit.id == run.id).unwrap();
        assert!(!run_status.checked_today);
        assert_eq!(run_status.streak.current, 0);
    }

    #[test]
    fn projections_use_the_owner_history() {
        let (db, clock) = setup(); // Monday 2024-01-08
        let tracker = HabitTracker::new(&db, &clock);
        let read = tracker.add_habit("ana", "Read", "book", 0).unwrap();
        tracker.add_habit("ana", "Run", "shoe", 0).unwrap();
        tracker.check_in("ana", &read.id).unwrap();

        let week = tracker.weekly_completion("ana", Weekday::Mon).unwrap();
        assert_eq!(week.week_start, clock.today());
        assert_eq!(week.days[0].ratio, Some(0.5));
        assert!(week.days[1].is_future());

        let grid = tracker.year_grid("ana", 28, Weekday::Mon).unwrap();
        assert_eq!(grid.cell(clock.today()).unwrap().count, 1);
        assert_eq!(tracker.day_completion("ana", clock.today()).unwrap(), 0.5);

        let summary = tracker.summary("ana", Weekday::Mon).unwrap();
        assert_eq!(summary.today_checked, 1);
        assert_eq!(summary.today_total, 2);
    }
}
