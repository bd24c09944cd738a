use clap::Subcommand;
use habitparty_core::HabitTracker;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Mark a habit done for today
    Done {
        /// Habit ID
        habit_id: String,
    },
    /// Remove today's check-in
    Undo {
        /// Habit ID
        habit_id: String,
    },
    /// All check-ins, newest day first
    List,
}

pub fn run(action: CheckinAction, ctx: &Context) -> CmdResult {
    let tracker = HabitTracker::new(&ctx.db, &ctx.clock);

    match action {
        CheckinAction::Done { habit_id } => {
            print_json(&tracker.check_in(&ctx.user_id, &habit_id)?)?;
        }
        CheckinAction::Undo { habit_id } => {
            tracker.uncheck(&ctx.user_id, &habit_id)?;
            println!("ok");
        }
        CheckinAction::List => {
            print_json(&tracker.list_for(&ctx.user_id)?)?;
        }
    }
    Ok(())
}
