//! Persistence boundary.
//!
//! The engines only talk to the [`Store`] trait. [`Database`] is the bundled
//! SQLite implementation; any transactional store that can report unique-key
//! violations as [`StoreError::Conflict`](crate::error::StoreError::Conflict)
//! can stand in for it.

mod config;
pub mod database;
pub mod migrations;

pub use config::{CalendarConfig, Config, FeedConfig, WeekStart};
pub use database::Database;

use std::path::PathBuf;

use crate::clock::DateKey;
use crate::error::{ConfigError, StoreResult};
use crate::model::{
    Challenge, ChallengeMember, CheckIn, DailyLog, Friendship, FriendshipStatus, Habit, Kudos,
    MemberStatus, Profile,
};

/// Returns `~/.config/habitparty[-dev]/` based on HABITPARTY_ENV.
///
/// Set HABITPARTY_ENV=dev to use the development data directory, and
/// HABITPARTY_HOME to replace `~/.config` as the base directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = match std::env::var_os("HABITPARTY_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };

    let env = std::env::var("HABITPARTY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitparty-dev")
    } else {
        base_dir.join("habitparty")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// CRUD surface the engines need from an external store.
///
/// Inserts on unique keys must fail with `StoreError::Conflict` when the key is
/// already taken; deletes report whether a row was removed and never fail for
/// a missing row.
pub trait Store {
    // === Habits ===

    fn insert_habit(&self, habit: &Habit) -> StoreResult<()>;
    fn get_habit(&self, id: &str) -> StoreResult<Option<Habit>>;
    /// Habits of `owner_id` by creation time.
    fn list_habits(&self, owner_id: &str) -> StoreResult<Vec<Habit>>;
    /// Deletes the habit with its check-ins (and their kudos) atomically.
    fn delete_habit(&self, id: &str) -> StoreResult<bool>;

    // === Check-ins ===

    /// Conflict when `(habit_id, completed_at)` already exists.
    fn insert_check_in(&self, check_in: &CheckIn) -> StoreResult<()>;
    fn get_check_in(&self, id: &str) -> StoreResult<Option<CheckIn>>;
    fn find_check_in(&self, habit_id: &str, day: DateKey) -> StoreResult<Option<CheckIn>>;
    fn delete_check_in(&self, habit_id: &str, day: DateKey) -> StoreResult<bool>;
    /// Check-ins of `owner_id`, newest `completed_at` first.
    fn list_check_ins(&self, owner_id: &str) -> StoreResult<Vec<CheckIn>>;
    fn list_habit_check_ins(&self, habit_id: &str) -> StoreResult<Vec<CheckIn>>;
    /// Latest check-ins (by `created_at`) across several owners.
    fn recent_check_ins(&self, owner_ids: &[String], limit: usize) -> StoreResult<Vec<CheckIn>>;

    // === Challenges ===

    /// Writes the challenge and all of its initial member rows in one
    /// transaction; on any failure nothing is persisted.
    fn create_challenge(&self, challenge: &Challenge, members: &[ChallengeMember])
        -> StoreResult<()>;
    fn get_challenge(&self, id: &str) -> StoreResult<Option<Challenge>>;
    /// Conflict when the user already has a row for the challenge.
    fn insert_member(&self, member: &ChallengeMember) -> StoreResult<()>;
    fn get_member(&self, id: &str) -> StoreResult<Option<ChallengeMember>>;
    fn find_member(&self, challenge_id: &str, user_id: &str)
        -> StoreResult<Option<ChallengeMember>>;
    /// Marks a member accepted, stamping `joined_at`.
    fn accept_member(&self, id: &str, joined_at: chrono::DateTime<chrono::Utc>)
        -> StoreResult<bool>;
    fn delete_member(&self, id: &str) -> StoreResult<bool>;
    fn list_members(&self, challenge_id: &str) -> StoreResult<Vec<ChallengeMember>>;
    fn memberships_for(
        &self,
        user_id: &str,
        status: Option<MemberStatus>,
    ) -> StoreResult<Vec<ChallengeMember>>;

    /// Conflict when `(challenge_id, user_id, log_date)` already exists.
    fn insert_daily_log(&self, log: &DailyLog) -> StoreResult<()>;
    /// Logs of a challenge, optionally restricted to one day.
    fn list_daily_logs(&self, challenge_id: &str, day: Option<DateKey>)
        -> StoreResult<Vec<DailyLog>>;

    // === Friendships ===

    /// Conflict when a row already exists for the unordered pair.
    fn insert_friendship(&self, friendship: &Friendship) -> StoreResult<()>;
    fn get_friendship(&self, id: &str) -> StoreResult<Option<Friendship>>;
    /// Row for the pair in either orientation.
    fn find_friendship(&self, a: &str, b: &str) -> StoreResult<Option<Friendship>>;
    fn accept_friendship(&self, id: &str) -> StoreResult<bool>;
    fn delete_friendship(&self, id: &str) -> StoreResult<bool>;
    /// Rows where `user_id` is on either side.
    fn list_friendships(
        &self,
        user_id: &str,
        status: Option<FriendshipStatus>,
    ) -> StoreResult<Vec<Friendship>>;

    // === Kudos ===

    /// Conflict when `(from_user_id, check_in_id)` already exists.
    fn insert_kudos(&self, kudos: &Kudos) -> StoreResult<()>;
    fn list_kudos(&self, check_in_ids: &[String]) -> StoreResult<Vec<Kudos>>;

    // === Profiles ===

    /// Insert or replace the profile keyed by `user_id`. `created_at` of an
    /// existing row is kept.
    fn upsert_profile(&self, profile: &Profile) -> StoreResult<()>;
    fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;
    fn list_profiles(&self, user_ids: &[String]) -> StoreResult<Vec<Profile>>;
    /// Profiles whose name contains `query`, ignoring ASCII case, by name.
    fn search_profiles(&self, query: &str) -> StoreResult<Vec<Profile>>;
}
