//! Party challenges: time-boxed group goals with per-member daily logs.
//!
//! Membership is a small state machine: an invitation starts `pending` and
//! either becomes `accepted` (terminal) or is deleted on decline. Every
//! mutation is safe to retry; unique-key conflicts come back as "already
//! done" outcomes rather than errors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{days_between, Clock, DateKey};
use crate::error::{Result, ValidationError};
use crate::friends::FriendGraph;
use crate::model::{new_id, Challenge, ChallengeMember, DailyLog, MemberStatus};
use crate::profile::ProfileBook;
use crate::storage::Store;

/// Result of [`ChallengeEngine::check_in`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LogOutcome {
    Logged(DailyLog),
    AlreadyLogged,
}

/// Result of [`ChallengeEngine::invite_friend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InviteOutcome {
    Invited(ChallengeMember),
    /// The friend already has a pending or accepted row.
    AlreadyInvited,
}

/// Result of [`ChallengeEngine::respond`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RespondOutcome {
    Accepted(ChallengeMember),
    AlreadyAccepted,
    Declined,
    /// Declining an invitation that no longer exists.
    AlreadyDeclined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProgress {
    pub user_id: String,
    /// Profile name, if the member has one.
    pub display_name: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub checked_in_today: bool,
    pub days_logged: u32,
}

/// A challenge as seen by one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeView {
    pub challenge: Challenge,
    /// Accepted members; the viewer first, then by join time.
    pub members: Vec<MemberProgress>,
    pub current_day: u32,
    pub is_complete: bool,
    pub viewer_checked_in_today: bool,
}

/// An invitation waiting for the invitee's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvite {
    pub member_id: String,
    pub challenge_id: String,
    pub title: String,
    pub target_habit_label: String,
    pub duration_days: u32,
    pub invited_by: Option<String>,
    pub invited_by_name: Option<String>,
}

/// 1-based day of the challenge on `today`, clamped to `1..=duration_days`.
pub fn current_day(challenge: &Challenge, today: DateKey) -> u32 {
    let day = days_between(challenge.start_date, today) + 1;
    let last = i64::from(challenge.duration_days.max(1));
    day.clamp(1, last) as u32
}

/// True once every day of the challenge is in the past.
pub fn is_complete(challenge: &Challenge, today: DateKey) -> bool {
    days_between(challenge.start_date, today) >= i64::from(challenge.duration_days)
}

pub struct ChallengeEngine<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> ChallengeEngine<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    fn friends(&self) -> FriendGraph<'a> {
        FriendGraph::new(self.store, self.clock)
    }

    fn profiles(&self) -> ProfileBook<'a> {
        ProfileBook::new(self.store, self.clock)
    }

    fn require_challenge(&self, challenge_id: &str) -> Result<Challenge> {
        Ok(self
            .store
            .get_challenge(challenge_id)?
            .ok_or_else(|| ValidationError::not_found("challenge", challenge_id))?)
    }

    fn require_accepted(&self, challenge_id: &str, user_id: &str) -> Result<ChallengeMember> {
        match self.store.find_member(challenge_id, user_id)? {
            Some(member) if member.is_accepted() => Ok(member),
            _ => Err(ValidationError::NotAMember {
                challenge_id: challenge_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into()),
        }
    }

    /// Create a challenge starting today.
    ///
    /// The creator joins immediately; each invitee gets a pending row. All
    /// rows are written atomically. Invitees must be accepted friends of the
    /// creator; duplicates and the creator are dropped from the list.
    pub fn create(
        &self,
        title: &str,
        target_habit_label: &str,
        duration_days: u32,
        creator_id: &str,
        invitee_ids: &[String],
    ) -> Result<Challenge> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title").into());
        }
        if duration_days == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_days",
                message: "must be at least 1".into(),
            }
            .into());
        }

        let mut invitees: Vec<&str> = Vec::new();
        for invitee in invitee_ids.iter().map(String::as_str) {
            if invitee == creator_id || invitees.contains(&invitee) {
                continue;
            }
            invitees.push(invitee);
        }

        let friends = self.friends();
        for invitee in &invitees {
            if !friends.are_friends(creator_id, invitee)? {
                return Err(ValidationError::NotFriends {
                    user_id: creator_id.to_string(),
                    other_id: invitee.to_string(),
                }
                .into());
            }
        }

        let now = self.clock.now();
        let challenge = Challenge {
            id: new_id(),
            title: title.to_string(),
            target_habit_label: target_habit_label.trim().to_string(),
            duration_days,
            start_date: self.clock.today(),
            created_by: creator_id.to_string(),
            created_at: now,
        };

        let mut members = Vec::with_capacity(invitees.len() + 1);
        members.push(ChallengeMember {
            id: new_id(),
            challenge_id: challenge.id.clone(),
            user_id: creator_id.to_string(),
            status: MemberStatus::Accepted,
            invited_by: None,
            joined_at: Some(now),
        });
        members.extend(invitees.iter().map(|invitee| ChallengeMember {
            id: new_id(),
            challenge_id: challenge.id.clone(),
            user_id: invitee.to_string(),
            status: MemberStatus::Pending,
            invited_by: Some(creator_id.to_string()),
            joined_at: None,
        }));

        self.store.create_challenge(&challenge, &members)?;
        info!(
            challenge_id = %challenge.id,
            creator_id,
            invited = invitees.len(),
            duration_days,
            "challenge created"
        );
        Ok(challenge)
    }

    /// Accept or decline an invitation.
    ///
    /// Accepting an accepted row and declining a missing row are no-ops.
    /// Declining an accepted membership is an invalid transition, accepting a
    /// missing row is not found.
    pub fn respond(&self, member_id: &str, accept: bool) -> Result<RespondOutcome> {
        let member = self.store.get_member(member_id)?;

        match (member, accept) {
            (None, true) => Err(ValidationError::not_found("challenge member", member_id).into()),
            (None, false) => {
                debug!(member_id, "decline of a missing invitation");
                Ok(RespondOutcome::AlreadyDeclined)
            }
            (Some(member), true) if member.is_accepted() => Ok(RespondOutcome::AlreadyAccepted),
            (Some(member), true) => {
                let joined_at = self.clock.now();
                if !self.store.accept_member(member_id, joined_at)? {
                    return self.settle_lost_accept(member_id);
                }
                info!(member_id, challenge_id = %member.challenge_id, "invitation accepted");
                Ok(RespondOutcome::Accepted(ChallengeMember {
                    status: MemberStatus::Accepted,
                    joined_at: Some(joined_at),
                    ..member
                }))
            }
            (Some(member), false) if member.is_accepted() => {
                Err(ValidationError::InvalidTransition {
                    entity: "challenge member",
                    id: member_id.to_string(),
                    message: "an accepted membership cannot be declined".into(),
                }
                .into())
            }
            (Some(member), false) => {
                self.store.delete_member(member_id)?;
                info!(member_id, challenge_id = %member.challenge_id, "invitation declined");
                Ok(RespondOutcome::Declined)
            }
        }
    }

    /// The row changed between the read and the update: either another
    /// accept won, or the invitation was declined in the meantime.
    fn settle_lost_accept(&self, member_id: &str) -> Result<RespondOutcome> {
        match self.store.get_member(member_id)? {
            Some(member) if member.is_accepted() => {
                debug!(member_id, "invitation accepted concurrently");
                Ok(RespondOutcome::AlreadyAccepted)
            }
            _ => Err(ValidationError::not_found("challenge member", member_id).into()),
        }
    }

    /// [`respond`](Self::respond) addressed by challenge and invitee.
    pub fn respond_to(
        &self,
        challenge_id: &str,
        user_id: &str,
        accept: bool,
    ) -> Result<RespondOutcome> {
        match self.store.find_member(challenge_id, user_id)? {
            Some(member) => self.respond(&member.id, accept),
            None if accept => Err(ValidationError::NotAMember {
                challenge_id: challenge_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into()),
            None => Ok(RespondOutcome::AlreadyDeclined),
        }
    }

    /// Log today's completion for `user_id`, who must be an accepted member.
    pub fn check_in(&self, challenge_id: &str, user_id: &str) -> Result<LogOutcome> {
        self.require_challenge(challenge_id)?;
        self.require_accepted(challenge_id, user_id)?;

        let log = DailyLog {
            id: new_id(),
            challenge_id: challenge_id.to_string(),
            user_id: user_id.to_string(),
            log_date: self.clock.today(),
            created_at: self.clock.now(),
        };
        match self.store.insert_daily_log(&log) {
            Ok(()) => {
                info!(challenge_id, user_id, day = %log.log_date, "challenge day logged");
                Ok(LogOutcome::Logged(log))
            }
            Err(e) if e.is_conflict() => {
                debug!(challenge_id, user_id, "challenge day already logged");
                Ok(LogOutcome::AlreadyLogged)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot of a challenge for `viewer_id`.
    pub fn view(&self, challenge_id: &str, viewer_id: &str) -> Result<ChallengeView> {
        let challenge = self.require_challenge(challenge_id)?;
        let today = self.clock.today();

        let mut days_logged: HashMap<String, u32> = HashMap::new();
        let mut logged_today: Vec<String> = Vec::new();
        for log in self.store.list_daily_logs(challenge_id, None)? {
            *days_logged.entry(log.user_id.clone()).or_default() += 1;
            if log.log_date == today {
                logged_today.push(log.user_id);
            }
        }

        let (viewer, others): (Vec<_>, Vec<_>) = self
            .store
            .list_members(challenge_id)?
            .into_iter()
            .filter(ChallengeMember::is_accepted)
            .partition(|m| m.user_id == viewer_id);

        let ordered: Vec<ChallengeMember> = viewer.into_iter().chain(others).collect();
        let user_ids: Vec<String> = ordered.iter().map(|m| m.user_id.clone()).collect();
        let mut names = self.profiles().display_names(&user_ids)?;

        let members: Vec<MemberProgress> = ordered
            .into_iter()
            .map(|m| MemberProgress {
                display_name: names.remove(&m.user_id),
                checked_in_today: logged_today.contains(&m.user_id),
                days_logged: days_logged.get(&m.user_id).copied().unwrap_or(0),
                joined_at: m.joined_at,
                user_id: m.user_id,
            })
            .collect();

        Ok(ChallengeView {
            current_day: current_day(&challenge, today),
            is_complete: is_complete(&challenge, today),
            viewer_checked_in_today: logged_today.iter().any(|u| u == viewer_id),
            members,
            challenge,
        })
    }

    /// Invite a friend into a challenge the inviter has joined.
    pub fn invite_friend(
        &self,
        challenge_id: &str,
        inviter_id: &str,
        friend_id: &str,
    ) -> Result<InviteOutcome> {
        self.require_challenge(challenge_id)?;
        self.require_accepted(challenge_id, inviter_id)?;
        if !self.friends().are_friends(inviter_id, friend_id)? {
            return Err(ValidationError::NotFriends {
                user_id: inviter_id.to_string(),
                other_id: friend_id.to_string(),
            }
            .into());
        }

        let member = ChallengeMember {
            id: new_id(),
            challenge_id: challenge_id.to_string(),
            user_id: friend_id.to_string(),
            status: MemberStatus::Pending,
            invited_by: Some(inviter_id.to_string()),
            joined_at: None,
        };
        match self.store.insert_member(&member) {
            Ok(()) => {
                info!(challenge_id, inviter_id, friend_id, "friend invited");
                Ok(InviteOutcome::Invited(member))
            }
            Err(e) if e.is_conflict() => Ok(InviteOutcome::AlreadyInvited),
            Err(e) => Err(e.into()),
        }
    }

    /// Invitations `user_id` has not answered yet.
    pub fn pending_invites(&self, user_id: &str) -> Result<Vec<PendingInvite>> {
        let pending = self
            .store
            .memberships_for(user_id, Some(MemberStatus::Pending))?;
        let inviters: Vec<String> = pending.iter().filter_map(|m| m.invited_by.clone()).collect();
        let names = self.profiles().display_names(&inviters)?;

        let mut invites = Vec::new();
        for member in pending {
            let Some(challenge) = self.store.get_challenge(&member.challenge_id)? else {
                continue;
            };
            invites.push(PendingInvite {
                invited_by_name: member
                    .invited_by
                    .as_ref()
                    .and_then(|id| names.get(id))
                    .cloned(),
                member_id: member.id,
                challenge_id: challenge.id,
                title: challenge.title,
                target_habit_label: challenge.target_habit_label,
                duration_days: challenge.duration_days,
                invited_by: member.invited_by,
            });
        }
        Ok(invites)
    }

    /// Challenges `user_id` has joined, most recent start date first.
    pub fn challenges_for(&self, user_id: &str) -> Result<Vec<Challenge>> {
        let mut challenges = Vec::new();
        for member in self
            .store
            .memberships_for(user_id, Some(MemberStatus::Accepted))?
        {
            if let Some(challenge) = self.store.get_challenge(&member.challenge_id)? {
                challenges.push(challenge);
            }
        }
        challenges.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(challenges)
    }

    /// Most recently started challenge `user_id` has joined.
    pub fn active_challenge(&self, user_id: &str) -> Result<Option<Challenge>> {
        Ok(self.challenges_for(user_id)?.into_iter().next())
    }
}
