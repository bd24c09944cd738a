use clap::Subcommand;
use habitparty_core::{ChallengeEngine, FriendGraph};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Start a challenge today and invite friends
    Create {
        /// Challenge title
        title: String,
        /// Habit the party commits to (free text)
        #[arg(long, default_value = "")]
        habit: String,
        /// Length in days
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Friend to invite (repeatable)
        #[arg(long = "invite")]
        invitees: Vec<String>,
    },
    /// Challenges you have joined
    List,
    /// Most recently started challenge you have joined
    Active,
    /// Progress of every member
    Show {
        /// Challenge ID
        id: String,
    },
    /// Log today's completion
    Log {
        /// Challenge ID
        id: String,
    },
    /// Invitations waiting for your answer
    Invites,
    /// Accept an invitation
    Accept {
        /// Challenge ID
        id: String,
    },
    /// Decline an invitation
    Decline {
        /// Challenge ID
        id: String,
    },
    /// Invite a friend into a challenge you have joined
    Invite {
        /// Challenge ID
        id: String,
        /// Friend's user ID
        friend: String,
    },
    /// Friends that can still be invited
    Eligible {
        /// Challenge ID
        id: String,
    },
}

pub fn run(action: ChallengeAction, ctx: &Context) -> CmdResult {
    let engine = ChallengeEngine::new(&ctx.db, &ctx.clock);
    let user = ctx.user_id.as_str();

    match action {
        ChallengeAction::Create {
            title,
            habit,
            days,
            invitees,
        } => {
            print_json(&engine.create(&title, &habit, days, user, &invitees)?)?;
        }
        ChallengeAction::List => print_json(&engine.challenges_for(user)?)?,
        ChallengeAction::Active => print_json(&engine.active_challenge(user)?)?,
        ChallengeAction::Show { id } => print_json(&engine.view(&id, user)?)?,
        ChallengeAction::Log { id } => print_json(&engine.check_in(&id, user)?)?,
        ChallengeAction::Invites => print_json(&engine.pending_invites(user)?)?,
        ChallengeAction::Accept { id } => print_json(&engine.respond_to(&id, user, true)?)?,
        ChallengeAction::Decline { id } => print_json(&engine.respond_to(&id, user, false)?)?,
        ChallengeAction::Invite { id, friend } => {
            print_json(&engine.invite_friend(&id, user, &friend)?)?;
        }
        ChallengeAction::Eligible { id } => {
            let graph = FriendGraph::new(&ctx.db, &ctx.clock);
            print_json(&graph.eligible_invitees(user, &id)?)?;
        }
    }
    Ok(())
}
