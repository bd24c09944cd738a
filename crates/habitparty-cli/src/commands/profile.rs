use clap::Subcommand;
use habitparty_core::ProfileBook;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Set your display name (and optionally an avatar URL)
    Set {
        name: String,
        /// Avatar URL; pass an empty string to clear it
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Show a profile (yours by default)
    Show {
        /// User ID
        user: Option<String>,
    },
    /// Search other users by name
    Find {
        query: String,
    },
}

pub fn run(action: ProfileAction, ctx: &Context) -> CmdResult {
    let book = ProfileBook::new(&ctx.db, &ctx.clock);

    match action {
        ProfileAction::Set { name, avatar_url } => {
            let current = book.get(&ctx.user_id)?.and_then(|p| p.avatar_url);
            let avatar_url = avatar_url.or(current);
            print_json(&book.set_profile(&ctx.user_id, &name, avatar_url.as_deref())?)?;
        }
        ProfileAction::Show { user } => {
            let user = user.unwrap_or_else(|| ctx.user_id.clone());
            match book.get(&user)? {
                Some(profile) => print_json(&profile)?,
                None => return Err(format!("no profile for {user}").into()),
            }
        }
        ProfileAction::Find { query } => {
            print_json(&book.find_by_name(&query, &ctx.user_id)?)?;
        }
    }
    Ok(())
}
