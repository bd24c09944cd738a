use clap::Subcommand;
use habitparty_core::FriendGraph;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum FriendAction {
    /// Send a friend request
    Request {
        /// User ID to befriend
        #[arg(required_unless_present = "name", conflicts_with = "name")]
        user: Option<String>,
        /// Find the user by profile name instead (case-insensitive, partial)
        #[arg(long)]
        name: Option<String>,
    },
    /// Accept an incoming request
    Accept {
        /// Friendship ID from `friend requests`
        id: String,
    },
    /// Unfriend, or cancel/decline a request
    Remove {
        /// The other user's ID
        user: String,
    },
    /// Your friends
    List,
    /// Incoming requests
    Requests,
}

pub fn run(action: FriendAction, ctx: &Context) -> CmdResult {
    let graph = FriendGraph::new(&ctx.db, &ctx.clock);
    let user = ctx.user_id.as_str();

    match action {
        FriendAction::Request { user: other, name } => {
            let outcome = match (other, name) {
                (_, Some(name)) => graph.request_by_name(user, &name)?,
                (Some(other), None) => graph.request(user, &other)?,
                (None, None) => return Err("a user ID or --name is required".into()),
            };
            print_json(&outcome)?;
        }
        FriendAction::Accept { id } => print_json(&graph.accept(user, &id)?)?,
        FriendAction::Remove { user: other } => {
            if graph.remove(user, &other)? {
                println!("removed: {other}");
            } else {
                println!("nothing to remove for {other}");
            }
        }
        FriendAction::List => print_json(&graph.friends_of(user)?)?,
        FriendAction::Requests => print_json(&graph.pending_requests(user)?)?,
    }
    Ok(())
}
