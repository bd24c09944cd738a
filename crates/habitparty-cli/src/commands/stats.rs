use clap::Subcommand;
use habitparty_core::consistency::MAX_WINDOW_DAYS;
use habitparty_core::{DateKey, HabitTracker, StreakSummary};
use serde::Serialize;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Dashboard numbers: today, this week, streaks
    Summary,
    /// Completion for each day of the current week
    Week,
    /// Consistency map ending today
    Grid {
        /// Days covered (defaults to calendar.grid_window_days)
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: Option<u32>,
    },
    /// Current and best streak of one habit
    Streak {
        /// Habit ID
        habit_id: String,
    },
    /// Completion ratio of a single day (YYYY-MM-DD)
    Day {
        date: DateKey,
    },
}

#[derive(Serialize)]
struct DayRatio {
    date: DateKey,
    ratio: f64,
}

pub fn run(action: StatsAction, ctx: &Context) -> CmdResult {
    let tracker = HabitTracker::new(&ctx.db, &ctx.clock);
    let first_weekday = ctx.config.first_weekday();

    match action {
        StatsAction::Summary => {
            print_json(&tracker.summary(&ctx.user_id, first_weekday)?)?;
        }
        StatsAction::Week => {
            print_json(&tracker.weekly_completion(&ctx.user_id, first_weekday)?)?;
        }
        StatsAction::Grid { days } => {
            let window = days.unwrap_or(ctx.config.calendar.grid_window_days);
            print_json(&tracker.year_grid(&ctx.user_id, window, first_weekday)?)?;
        }
        StatsAction::Streak { habit_id } => {
            let streak = StreakSummary {
                current: tracker.streak(&habit_id)?,
                best: tracker.best_streak(&habit_id)?,
            };
            print_json(&streak)?;
        }
        StatsAction::Day { date } => {
            let ratio = tracker.day_completion(&ctx.user_id, date)?;
            print_json(&DayRatio { date, ratio })?;
        }
    }
    Ok(())
}
