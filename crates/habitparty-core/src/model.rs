//! Persisted entities.
//!
//! Rows are plain data; all lifecycle rules live in the engines that write them
//! ([`HabitTracker`](crate::HabitTracker), [`ChallengeEngine`](crate::ChallengeEngine),
//! [`FriendGraph`](crate::FriendGraph), [`ActivityFeed`](crate::ActivityFeed),
//! [`ProfileBook`](crate::ProfileBook)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::DateKey;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A habit owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub icon: String,
    pub goal_minutes: u32,
    pub created_at: DateTime<Utc>,
}

/// "Habit completed on day D". At most one per `(habit_id, completed_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub owner_id: String,
    pub habit_id: String,
    pub completed_at: DateKey,
    pub created_at: DateTime<Utc>,
}

/// A time-boxed group goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    /// Free text, not a reference to a [`Habit`].
    pub target_habit_label: String,
    pub duration_days: u32,
    pub start_date: DateKey,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Membership state. Declined invitations are deleted, so there is no
/// "declined" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Accepted,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MemberStatus::Pending),
            "accepted" => Some(MemberStatus::Accepted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeMember {
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    pub status: MemberStatus,
    pub invited_by: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl ChallengeMember {
    pub fn is_accepted(&self) -> bool {
        self.status == MemberStatus::Accepted
    }
}

/// One member's completion of one challenge day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    pub log_date: DateKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            _ => None,
        }
    }
}

/// Directional row (`user_id` asked `friend_id`), symmetric once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// The side of the pair that is not `user_id`, if `user_id` is part of it.
    pub fn other(&self, user_id: &str) -> Option<&str> {
        if self.user_id == user_id {
            Some(&self.friend_id)
        } else if self.friend_id == user_id {
            Some(&self.user_id)
        } else {
            None
        }
    }

    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.user_id == a && self.friend_id == b) || (self.user_id == b && self.friend_id == a)
    }
}

/// Acknowledgement on a friend's check-in. One per `(from_user_id, check_in_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kudos {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub check_in_id: String,
    pub created_at: DateTime<Utc>,
}

/// Public identity of a user, shown next to their activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
