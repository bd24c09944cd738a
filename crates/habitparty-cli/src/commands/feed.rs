use clap::Subcommand;
use habitparty_core::ActivityFeed;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum FeedAction {
    /// Friends' latest check-ins
    Show {
        /// Number of items (defaults to feed.limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Give kudos on a friend's check-in
    Kudos {
        /// Check-in ID
        check_in_id: String,
    },
}

pub fn run(action: FeedAction, ctx: &Context) -> CmdResult {
    let feed = ActivityFeed::new(&ctx.db, &ctx.clock);

    match action {
        FeedAction::Show { limit } => {
            let limit = limit.unwrap_or(ctx.config.feed.limit);
            print_json(&feed.friend_feed(&ctx.user_id, limit)?)?;
        }
        FeedAction::Kudos { check_in_id } => {
            print_json(&feed.give_kudos(&ctx.user_id, &check_in_id)?)?;
        }
    }
    Ok(())
}
