//! SQLite-backed [`Store`].
//!
//! Provides persistent storage for:
//! - Habits and their daily check-ins
//! - Party challenges, memberships and daily logs
//! - Friendships and kudos
//! - User profiles
//!
//! Uniqueness rules are enforced by the schema; violations surface as
//! [`StoreError::Conflict`] through the `From<rusqlite::Error>` conversion.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{data_dir, migrations, Store};
use crate::clock::DateKey;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    Challenge, ChallengeMember, CheckIn, DailyLog, Friendship, FriendshipStatus, Habit, Kudos,
    MemberStatus, Profile,
};

const HABIT_COLUMNS: &str = "id, owner_id, name, icon, goal_minutes, created_at";
const CHECK_IN_COLUMNS: &str = "id, owner_id, habit_id, completed_at, created_at";
const CHALLENGE_COLUMNS: &str =
    "id, title, target_habit_label, duration_days, start_date, created_by, created_at";
const MEMBER_COLUMNS: &str = "id, challenge_id, user_id, status, invited_by, joined_at";
const DAILY_LOG_COLUMNS: &str = "id, challenge_id, user_id, log_date, created_at";
const FRIENDSHIP_COLUMNS: &str = "id, user_id, friend_id, status, created_at";
const KUDOS_COLUMNS: &str = "id, from_user_id, to_user_id, check_in_id, created_at";
const PROFILE_COLUMNS: &str = "user_id, name, avatar_url, created_at, updated_at";

// === Column conversions ===

impl ToSql for DateKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for DateKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        DateKey::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for MemberStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MemberStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        MemberStatus::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown member status '{raw}'").into()))
    }
}

impl ToSql for FriendshipStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FriendshipStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        FriendshipStatus::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown friendship status '{raw}'").into()))
    }
}

/// Parse an RFC3339 column into a UTC timestamp.
fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn optional_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}

fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
        goal_minutes: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn row_to_check_in(row: &Row) -> rusqlite::Result<CheckIn> {
    Ok(CheckIn {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        habit_id: row.get(2)?,
        completed_at: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn row_to_challenge(row: &Row) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        title: row.get(1)?,
        target_habit_label: row.get(2)?,
        duration_days: row.get(3)?,
        start_date: row.get(4)?,
        created_by: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

fn row_to_member(row: &Row) -> rusqlite::Result<ChallengeMember> {
    Ok(ChallengeMember {
        id: row.get(0)?,
        challenge_id: row.get(1)?,
        user_id: row.get(2)?,
        status: row.get(3)?,
        invited_by: row.get(4)?,
        joined_at: optional_timestamp_at(row, 5)?,
    })
}

fn row_to_daily_log(row: &Row) -> rusqlite::Result<DailyLog> {
    Ok(DailyLog {
        id: row.get(0)?,
        challenge_id: row.get(1)?,
        user_id: row.get(2)?,
        log_date: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn row_to_friendship(row: &Row) -> rusqlite::Result<Friendship> {
    Ok(Friendship {
        id: row.get(0)?,
        user_id: row.get(1)?,
        friend_id: row.get(2)?,
        status: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn row_to_kudos(row: &Row) -> rusqlite::Result<Kudos> {
    Ok(Kudos {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        check_in_id: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        name: row.get(1)?,
        avatar_url: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        updated_at: timestamp_at(row, 4)?,
    })
}

/// `?1, ?2, ...` for an IN clause of `n` values, starting at `?{first}`.
fn placeholders(first: usize, n: usize) -> String {
    (first..first + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQLite database implementing [`Store`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/habitparty/habitparty.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> crate::error::Result<Self> {
        let path = data_dir()?.join("habitparty.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::init(conn)?;
        info!("database opened at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on any error.
    fn transactional<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(&self.conn) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err.into())
            }
        }
    }

    fn query_list<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_one<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> StoreResult<Option<T>> {
        Ok(self.conn.query_row(sql, params, map).optional()?)
    }
}

fn insert_member_row(conn: &Connection, member: &ChallengeMember) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO challenge_members (id, challenge_id, user_id, status, invited_by, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            member.id,
            member.challenge_id,
            member.user_id,
            member.status,
            member.invited_by,
            member.joined_at.map(|t| t.to_rfc3339()),
        ],
    )
}

impl Store for Database {
    // === Habits ===

    fn insert_habit(&self, habit: &Habit) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO habits (id, owner_id, name, icon, goal_minutes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.id,
                habit.owner_id,
                habit.name,
                habit.icon,
                habit.goal_minutes,
                habit.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_habit(&self, id: &str) -> StoreResult<Option<Habit>> {
        self.query_one(
            &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
            params![id],
            row_to_habit,
        )
    }

    fn list_habits(&self, owner_id: &str) -> StoreResult<Vec<Habit>> {
        self.query_list(
            &format!(
                "SELECT {HABIT_COLUMNS} FROM habits WHERE owner_id = ?1 ORDER BY created_at, id"
            ),
            params![owner_id],
            row_to_habit,
        )
    }

    fn delete_habit(&self, id: &str) -> StoreResult<bool> {
        let removed = self.transactional(|conn| {
            conn.execute(
                "DELETE FROM kudos WHERE check_in_id IN
                    (SELECT id FROM check_ins WHERE habit_id = ?1)",
                params![id],
            )?;
            conn.execute("DELETE FROM check_ins WHERE habit_id = ?1", params![id])?;
            conn.execute("DELETE FROM habits WHERE id = ?1", params![id])
        })?;
        Ok(removed > 0)
    }

    // === Check-ins ===

    fn insert_check_in(&self, check_in: &CheckIn) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO check_ins (id, owner_id, habit_id, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                check_in.id,
                check_in.owner_id,
                check_in.habit_id,
                check_in.completed_at,
                check_in.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_check_in(&self, id: &str) -> StoreResult<Option<CheckIn>> {
        self.query_one(
            &format!("SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE id = ?1"),
            params![id],
            row_to_check_in,
        )
    }

    fn find_check_in(&self, habit_id: &str, day: DateKey) -> StoreResult<Option<CheckIn>> {
        self.query_one(
            &format!(
                "SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE habit_id = ?1 AND completed_at = ?2"
            ),
            params![habit_id, day],
            row_to_check_in,
        )
    }

    fn delete_check_in(&self, habit_id: &str, day: DateKey) -> StoreResult<bool> {
        let removed = self.transactional(|conn| {
            conn.execute(
                "DELETE FROM kudos WHERE check_in_id IN
                    (SELECT id FROM check_ins WHERE habit_id = ?1 AND completed_at = ?2)",
                params![habit_id, day],
            )?;
            conn.execute(
                "DELETE FROM check_ins WHERE habit_id = ?1 AND completed_at = ?2",
                params![habit_id, day],
            )
        })?;
        Ok(removed > 0)
    }

    fn list_check_ins(&self, owner_id: &str) -> StoreResult<Vec<CheckIn>> {
        self.query_list(
            &format!(
                "SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE owner_id = ?1
                 ORDER BY completed_at DESC, created_at DESC"
            ),
            params![owner_id],
            row_to_check_in,
        )
    }

    fn list_habit_check_ins(&self, habit_id: &str) -> StoreResult<Vec<CheckIn>> {
        self.query_list(
            &format!(
                "SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE habit_id = ?1
                 ORDER BY completed_at DESC"
            ),
            params![habit_id],
            row_to_check_in,
        )
    }

    fn recent_check_ins(&self, owner_ids: &[String], limit: usize) -> StoreResult<Vec<CheckIn>> {
        if owner_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE owner_id IN ({})
             ORDER BY created_at DESC, id LIMIT {limit}",
            placeholders(1, owner_ids.len())
        );
        self.query_list(&sql, params_from_iter(owner_ids.iter()), row_to_check_in)
    }

    // === Challenges ===

    fn create_challenge(
        &self,
        challenge: &Challenge,
        members: &[ChallengeMember],
    ) -> StoreResult<()> {
        self.transactional(|conn| {
            conn.execute(
                "INSERT INTO challenges
                    (id, title, target_habit_label, duration_days, start_date, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    challenge.id,
                    challenge.title,
                    challenge.target_habit_label,
                    challenge.duration_days,
                    challenge.start_date,
                    challenge.created_by,
                    challenge.created_at.to_rfc3339(),
                ],
            )?;
            for member in members {
                insert_member_row(conn, member)?;
            }
            Ok(())
        })?;
        debug!(
            challenge_id = %challenge.id,
            members = members.len(),
            "challenge rows committed"
        );
        Ok(())
    }

    fn get_challenge(&self, id: &str) -> StoreResult<Option<Challenge>> {
        self.query_one(
            &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ?1"),
            params![id],
            row_to_challenge,
        )
    }

    fn insert_member(&self, member: &ChallengeMember) -> StoreResult<()> {
        insert_member_row(&self.conn, member)?;
        Ok(())
    }

    fn get_member(&self, id: &str) -> StoreResult<Option<ChallengeMember>> {
        self.query_one(
            &format!("SELECT {MEMBER_COLUMNS} FROM challenge_members WHERE id = ?1"),
            params![id],
            row_to_member,
        )
    }

    fn find_member(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<ChallengeMember>> {
        self.query_one(
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM challenge_members
                 WHERE challenge_id = ?1 AND user_id = ?2"
            ),
            params![challenge_id, user_id],
            row_to_member,
        )
    }

    fn accept_member(&self, id: &str, joined_at: DateTime<Utc>) -> StoreResult<bool> {
        let updated = self.conn.execute(
            "UPDATE challenge_members SET status = 'accepted', joined_at = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, joined_at.to_rfc3339()],
        )?;
        Ok(updated > 0)
    }

    fn delete_member(&self, id: &str) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM challenge_members WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn list_members(&self, challenge_id: &str) -> StoreResult<Vec<ChallengeMember>> {
        self.query_list(
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM challenge_members WHERE challenge_id = ?1
                 ORDER BY joined_at IS NULL, joined_at, user_id"
            ),
            params![challenge_id],
            row_to_member,
        )
    }

    fn memberships_for(
        &self,
        user_id: &str,
        status: Option<MemberStatus>,
    ) -> StoreResult<Vec<ChallengeMember>> {
        match status {
            Some(status) => self.query_list(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM challenge_members
                     WHERE user_id = ?1 AND status = ?2 ORDER BY id"
                ),
                params![user_id, status],
                row_to_member,
            ),
            None => self.query_list(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM challenge_members WHERE user_id = ?1 ORDER BY id"
                ),
                params![user_id],
                row_to_member,
            ),
        }
    }

    fn insert_daily_log(&self, log: &DailyLog) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO daily_logs (id, challenge_id, user_id, log_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.id,
                log.challenge_id,
                log.user_id,
                log.log_date,
                log.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_daily_logs(
        &self,
        challenge_id: &str,
        day: Option<DateKey>,
    ) -> StoreResult<Vec<DailyLog>> {
        match day {
            Some(day) => self.query_list(
                &format!(
                    "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
                     WHERE challenge_id = ?1 AND log_date = ?2 ORDER BY user_id"
                ),
                params![challenge_id, day],
                row_to_daily_log,
            ),
            None => self.query_list(
                &format!(
                    "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
                     WHERE challenge_id = ?1 ORDER BY log_date, user_id"
                ),
                params![challenge_id],
                row_to_daily_log,
            ),
        }
    }

    // === Friendships ===

    fn insert_friendship(&self, friendship: &Friendship) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO friendships (id, user_id, friend_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                friendship.id,
                friendship.user_id,
                friendship.friend_id,
                friendship.status,
                friendship.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_friendship(&self, id: &str) -> StoreResult<Option<Friendship>> {
        self.query_one(
            &format!("SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE id = ?1"),
            params![id],
            row_to_friendship,
        )
    }

    fn find_friendship(&self, a: &str, b: &str) -> StoreResult<Option<Friendship>> {
        self.query_one(
            &format!(
                "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)"
            ),
            params![a, b],
            row_to_friendship,
        )
    }

    fn accept_friendship(&self, id: &str) -> StoreResult<bool> {
        let updated = self.conn.execute(
            "UPDATE friendships SET status = 'accepted' WHERE id = ?1 AND status = 'pending'",
            params![id],
        )?;
        Ok(updated > 0)
    }

    fn delete_friendship(&self, id: &str) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM friendships WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn list_friendships(
        &self,
        user_id: &str,
        status: Option<FriendshipStatus>,
    ) -> StoreResult<Vec<Friendship>> {
        match status {
            Some(status) => self.query_list(
                &format!(
                    "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
                     WHERE (user_id = ?1 OR friend_id = ?1) AND status = ?2
                     ORDER BY created_at, id"
                ),
                params![user_id, status],
                row_to_friendship,
            ),
            None => self.query_list(
                &format!(
                    "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
                     WHERE user_id = ?1 OR friend_id = ?1 ORDER BY created_at, id"
                ),
                params![user_id],
                row_to_friendship,
            ),
        }
    }

    // === Kudos ===

    fn insert_kudos(&self, kudos: &Kudos) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kudos (id, from_user_id, to_user_id, check_in_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kudos.id,
                kudos.from_user_id,
                kudos.to_user_id,
                kudos.check_in_id,
                kudos.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_kudos(&self, check_in_ids: &[String]) -> StoreResult<Vec<Kudos>> {
        if check_in_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {KUDOS_COLUMNS} FROM kudos WHERE check_in_id IN ({}) ORDER BY created_at, id",
            placeholders(1, check_in_ids.len())
        );
        self.query_list(&sql, params_from_iter(check_in_ids.iter()), row_to_kudos)
    }

    // === Profiles ===

    fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, name, avatar_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
            params![
                profile.user_id,
                profile.name,
                profile.avatar_url,
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )?;
        debug!(user_id = %profile.user_id, "profile saved");
        Ok(())
    }

    fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        self.query_one(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
            params![user_id],
            row_to_profile,
        )
    }

    fn list_profiles(&self, user_ids: &[String]) -> StoreResult<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id IN ({}) ORDER BY name, user_id",
            placeholders(1, user_ids.len())
        );
        self.query_list(&sql, params_from_iter(user_ids.iter()), row_to_profile)
    }

    fn search_profiles(&self, query: &str) -> StoreResult<Vec<Profile>> {
        self.query_list(
            &format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles
                 WHERE instr(lower(name), lower(?1)) > 0 ORDER BY name, user_id"
            ),
            params![query],
            row_to_profile,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::new_id;

    fn day(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn make_habit(owner: &str) -> Habit {
        Habit {
            id: new_id(),
            owner_id: owner.to_string(),
            name: "Read".to_string(),
            icon: "book".to_string(),
            goal_minutes: 20,
            created_at: Utc::now(),
        }
    }

    fn make_check_in(habit: &Habit, on: &str) -> CheckIn {
        CheckIn {
            id: new_id(),
            owner_id: habit.owner_id.clone(),
            habit_id: habit.id.clone(),
            completed_at: day(on),
            created_at: Utc::now(),
        }
    }

    fn make_challenge(creator: &str) -> Challenge {
        Challenge {
            id: new_id(),
            title: "30 days of running".to_string(),
            target_habit_label: "Run".to_string(),
            duration_days: 30,
            start_date: day("2024-01-01"),
            created_by: creator.to_string(),
            created_at: Utc::now(),
        }
    }

    fn make_member(challenge: &Challenge, user: &str, status: MemberStatus) -> ChallengeMember {
        ChallengeMember {
            id: new_id(),
            challenge_id: challenge.id.clone(),
            user_id: user.to_string(),
            status,
            invited_by: None,
            joined_at: None,
        }
    }

    #[test]
    fn habit_round_trip() {
        let db = Database::open_memory().unwrap();
        let habit = make_habit("ana");
        db.insert_habit(&habit).unwrap();

        let loaded = db.get_habit(&habit.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Read");
        assert_eq!(loaded.goal_minutes, 20);
        assert_eq!(db.list_habits("ana").unwrap().len(), 1);
        assert!(db.list_habits("bia").unwrap().is_empty());
    }

    #[test]
    fn duplicate_check_in_is_conflict() {
        let db = Database::open_memory().unwrap();
        let habit = make_habit("ana");
        db.insert_habit(&habit).unwrap();
        db.insert_check_in(&make_check_in(&habit, "2024-01-01")).unwrap();

        let err = db
            .insert_check_in(&make_check_in(&habit, "2024-01-01"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(db.list_habit_check_ins(&habit.id).unwrap().len(), 1);
    }

    #[test]
    fn check_ins_are_listed_newest_day_first() {
        let db = Database::open_memory().unwrap();
        let habit = make_habit("ana");
        db.insert_habit(&habit).unwrap();
        for on in ["2024-01-02", "2024-01-05", "2024-01-01"] {
            db.insert_check_in(&make_check_in(&habit, on)).unwrap();
        }

        let days: Vec<String> = db
            .list_check_ins("ana")
            .unwrap()
            .into_iter()
            .map(|c| c.completed_at.to_string())
            .collect();
        assert_eq!(days, vec!["2024-01-05", "2024-01-02", "2024-01-01"]);
    }

    #[test]
    fn delete_check_in_reports_missing_rows() {
        let db = Database::open_memory().unwrap();
        let habit = make_habit("ana");
        db.insert_habit(&habit).unwrap();
        db.insert_check_in(&make_check_in(&habit, "2024-01-01")).unwrap();

        assert!(db.delete_check_in(&habit.id, day("2024-01-01")).unwrap());
        assert!(!db.delete_check_in(&habit.id, day("2024-01-01")).unwrap());
    }

    #[test]
    fn delete_habit_cascades() {
        let db = Database::open_memory().unwrap();
        let habit = make_habit("ana");
        db.insert_habit(&habit).unwrap();
        let check_in = make_check_in(&habit, "2024-01-01");
        db.insert_check_in(&check_in).unwrap();
        db.insert_kudos(&Kudos {
            id: new_id(),
            from_user_id: "bia".into(),
            to_user_id: "ana".into(),
            check_in_id: check_in.id.clone(),
            created_at: Utc::now(),
        })
        .unwrap();

        assert!(db.delete_habit(&habit.id).unwrap());
        assert!(db.get_habit(&habit.id).unwrap().is_none());
        assert!(db.list_check_ins("ana").unwrap().is_empty());
        assert!(db.list_kudos(&[check_in.id]).unwrap().is_empty());
    }

    #[test]
    fn create_challenge_is_all_or_nothing() {
        let db = Database::open_memory().unwrap();
        let challenge = make_challenge("ana");
        // Same user twice violates UNIQUE (challenge_id, user_id)
        let members = vec![
            make_member(&challenge, "ana", MemberStatus::Accepted),
            make_member(&challenge, "bia", MemberStatus::Pending),
            make_member(&challenge, "bia", MemberStatus::Pending),
        ];

        let err = db.create_challenge(&challenge, &members).unwrap_err();
        assert!(err.is_conflict());
        assert!(db.get_challenge(&challenge.id).unwrap().is_none());
        assert!(db.list_members(&challenge.id).unwrap().is_empty());
    }

    #[test]
    fn accept_member_only_touches_pending_rows() {
        let db = Database::open_memory().unwrap();
        let challenge = make_challenge("ana");
        let invite = make_member(&challenge, "bia", MemberStatus::Pending);
        db.create_challenge(&challenge, &[invite.clone()]).unwrap();

        assert!(db.accept_member(&invite.id, Utc::now()).unwrap());
        assert!(!db.accept_member(&invite.id, Utc::now()).unwrap());
        let stored = db.get_member(&invite.id).unwrap().unwrap();
        assert!(stored.is_accepted());
        assert!(stored.joined_at.is_some());
    }

    #[test]
    fn daily_logs_filter_by_day() {
        let db = Database::open_memory().unwrap();
        let challenge = make_challenge("ana");
        db.create_challenge(&challenge, &[]).unwrap();
        for (user, on) in [("ana", "2024-01-01"), ("bia", "2024-01-01"), ("ana", "2024-01-02")] {
            db.insert_daily_log(&DailyLog {
                id: new_id(),
                challenge_id: challenge.id.clone(),
                user_id: user.into(),
                log_date: day(on),
                created_at: Utc::now(),
            })
            .unwrap();
        }

        assert_eq!(
            db.list_daily_logs(&challenge.id, Some(day("2024-01-01")))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(db.list_daily_logs(&challenge.id, None).unwrap().len(), 3);
    }

    #[test]
    fn friendship_lookup_ignores_orientation() {
        let db = Database::open_memory().unwrap();
        let friendship = Friendship {
            id: new_id(),
            user_id: "ana".into(),
            friend_id: "bia".into(),
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        db.insert_friendship(&friendship).unwrap();

        let found = db.find_friendship("bia", "ana").unwrap().unwrap();
        assert_eq!(found.id, friendship.id);

        let reversed = Friendship {
            id: new_id(),
            user_id: "bia".into(),
            friend_id: "ana".into(),
            ..friendship.clone()
        };
        assert!(db.insert_friendship(&reversed).unwrap_err().is_conflict());
        assert_eq!(
            db.list_friendships("bia", Some(FriendshipStatus::Pending))
                .unwrap()
                .len(),
            1
        );
        assert!(db
            .list_friendships("bia", Some(FriendshipStatus::Accepted))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn recent_check_ins_respects_owners_and_limit() {
        let db = Database::open_memory().unwrap();
        let ana = make_habit("ana");
        let bia = make_habit("bia");
        let caio = make_habit("caio");
        for habit in [&ana, &bia, &caio] {
            db.insert_habit(habit).unwrap();
        }
        for on in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            db.insert_check_in(&make_check_in(&ana, on)).unwrap();
            db.insert_check_in(&make_check_in(&bia, on)).unwrap();
            db.insert_check_in(&make_check_in(&caio, on)).unwrap();
        }

        let owners = vec!["ana".to_string(), "bia".to_string()];
        let recent = db.recent_check_ins(&owners, 4).unwrap();
        assert_eq!(recent.len(), 4);
        assert!(recent.iter().all(|c| c.owner_id != "caio"));
        assert!(db.recent_check_ins(&[], 10).unwrap().is_empty());
    }

    fn make_profile(user: &str, name: &str) -> Profile {
        let now = Utc::now();
        Profile {
            user_id: user.to_string(),
            name: name.to_string(),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn upsert_profile_keeps_created_at() {
        let db = Database::open_memory().unwrap();
        let first = make_profile("ana", "Ana");
        db.upsert_profile(&first).unwrap();

        let renamed = Profile {
            name: "Ana Clara".to_string(),
            avatar_url: Some("https://example.com/ana.png".to_string()),
            created_at: first.created_at + chrono::Duration::days(1),
            updated_at: first.updated_at + chrono::Duration::days(1),
            ..first.clone()
        };
        db.upsert_profile(&renamed).unwrap();

        let loaded = db.get_profile("ana").unwrap().unwrap();
        assert_eq!(loaded.name, "Ana Clara");
        assert_eq!(loaded.avatar_url, renamed.avatar_url);
        assert_eq!(loaded.created_at.timestamp(), first.created_at.timestamp());
        assert_eq!(loaded.updated_at.timestamp(), renamed.updated_at.timestamp());
        assert!(db.get_profile("bia").unwrap().is_none());
    }

    #[test]
    fn profiles_are_listed_and_searched_by_name() {
        let db = Database::open_memory().unwrap();
        db.upsert_profile(&make_profile("u1", "Bianca")).unwrap();
        db.upsert_profile(&make_profile("u2", "Ana")).unwrap();
        db.upsert_profile(&make_profile("u3", "Fabiana")).unwrap();

        let listed = db
            .list_profiles(&["u1".to_string(), "u2".to_string(), "zz".to_string()])
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bianca"]);
        assert!(db.list_profiles(&[]).unwrap().is_empty());

        let found = db.search_profiles("BIAN").unwrap();
        let ids: Vec<&str> = found.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u3"]);
        assert!(db.search_profiles("zed").unwrap().is_empty());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habitparty.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.insert_habit(&make_habit("ana")).unwrap();
        }
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.list_habits("ana").unwrap().len(), 1);
    }
}
