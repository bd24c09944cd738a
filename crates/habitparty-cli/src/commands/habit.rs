use clap::Subcommand;
use habitparty_core::HabitTracker;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Add {
        /// Habit name
        name: String,
        /// Icon shown next to the name
        #[arg(long, default_value = "")]
        icon: String,
        /// Daily goal in minutes
        #[arg(long, default_value_t = 0)]
        goal_minutes: u32,
    },
    /// List habits with today's state and streaks
    List,
    /// Delete a habit and its check-ins
    Delete {
        /// Habit ID
        id: String,
    },
}

pub fn run(action: HabitAction, ctx: &Context) -> CmdResult {
    let tracker = HabitTracker::new(&ctx.db, &ctx.clock);

    match action {
        HabitAction::Add {
            name,
            icon,
            goal_minutes,
        } => {
            let habit = tracker.add_habit(&ctx.user_id, &name, &icon, goal_minutes)?;
            print_json(&habit)?;
        }
        HabitAction::List => {
            print_json(&tracker.overview(&ctx.user_id)?)?;
        }
        HabitAction::Delete { id } => {
            if tracker.delete_habit(&ctx.user_id, &id)? {
                println!("habit deleted: {id}");
            } else {
                println!("no such habit: {id}");
            }
        }
    }
    Ok(())
}
