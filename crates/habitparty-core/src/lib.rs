//! # Habitparty Core Library
//!
//! This library provides the core logic for habitparty, a habit tracker with
//! streaks, consistency maps and small group challenges between friends.
//! It follows a CLI-first philosophy: every operation is available through the
//! standalone `habitparty` binary, and any other front end is a thin layer over
//! the same engines.
//!
//! ## Architecture
//!
//! - **Engines**: short-lived structs borrowing a [`Store`] and a [`Clock`];
//!   they validate, write, and recompute from the store on every call
//! - **Derived views**: pure functions for streaks and consistency maps
//! - **Storage**: SQLite persistence behind the [`Store`] trait and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`HabitTracker`]: habits and daily check-ins
//! - [`ChallengeEngine`]: party challenges and their membership lifecycle
//! - [`FriendGraph`]: friend requests and the symmetric friendship relation
//! - [`ActivityFeed`]: friends' check-ins and kudos
//! - [`ProfileBook`]: display names and lookup by name
//! - [`Database`]: SQLite implementation of [`Store`]
//! - [`Config`]: application configuration management

pub mod challenge;
pub mod clock;
pub mod consistency;
pub mod error;
pub mod feed;
pub mod friends;
pub mod habits;
pub mod model;
pub mod profile;
pub mod storage;
pub mod streak;

pub use challenge::{
    ChallengeEngine, ChallengeView, InviteOutcome, LogOutcome, MemberProgress, PendingInvite,
    RespondOutcome,
};
pub use clock::{days_between, Clock, DateKey, FixedClock, SystemClock};
pub use consistency::{
    ConsistencySummary, DayCompletion, DayStatus, GridCell, MonthLabel, WeeklyCompletion, YearGrid,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use feed::{ActivityFeed, FeedItem, KudosOutcome};
pub use friends::{FriendGraph, FriendRequestOutcome};
pub use habits::{CheckInOutcome, HabitStatus, HabitTracker};
pub use model::{
    Challenge, ChallengeMember, CheckIn, DailyLog, Friendship, FriendshipStatus, Habit, Kudos,
    MemberStatus, Profile,
};
pub use profile::ProfileBook;
pub use storage::{Config, Database, Store, WeekStart};
pub use streak::{best_streak, current_streak, StreakSummary};
