//! Database schema migrations for habitparty.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: habits, check-ins, challenges, members, daily logs, friendships.
///
/// Every "at most one" rule of the domain is a UNIQUE constraint so that
/// concurrent writers collapse onto a single row.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL,
            name         TEXT NOT NULL,
            icon         TEXT NOT NULL DEFAULT '',
            goal_minutes INTEGER NOT NULL DEFAULT 0 CHECK (goal_minutes >= 0),
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS check_ins (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL,
            habit_id     TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            completed_at TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            UNIQUE (habit_id, completed_at)
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id                 TEXT PRIMARY KEY,
            title              TEXT NOT NULL,
            target_habit_label TEXT NOT NULL DEFAULT '',
            duration_days      INTEGER NOT NULL CHECK (duration_days > 0),
            start_date         TEXT NOT NULL,
            created_by         TEXT NOT NULL,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenge_members (
            id           TEXT PRIMARY KEY,
            challenge_id TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
            user_id      TEXT NOT NULL,
            status       TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
            invited_by   TEXT,
            joined_at    TEXT,
            UNIQUE (challenge_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS daily_logs (
            id           TEXT PRIMARY KEY,
            challenge_id TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
            user_id      TEXT NOT NULL,
            log_date     TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            UNIQUE (challenge_id, user_id, log_date)
        );

        CREATE TABLE IF NOT EXISTS friendships (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            friend_id  TEXT NOT NULL,
            status     TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
            created_at TEXT NOT NULL,
            CHECK (user_id <> friend_id)
        );

        -- One row per unordered pair, whichever side asked first
        CREATE UNIQUE INDEX IF NOT EXISTS idx_friendships_pair
            ON friendships(min(user_id, friend_id), max(user_id, friend_id));

        CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_check_ins_owner ON check_ins(owner_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_members_user ON challenge_members(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_daily_logs_day ON daily_logs(challenge_id, log_date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    info!("applied schema migration v1");
    Ok(())
}

/// Migration v2: kudos on check-ins.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kudos (
            id           TEXT PRIMARY KEY,
            from_user_id TEXT NOT NULL,
            to_user_id   TEXT NOT NULL,
            check_in_id  TEXT NOT NULL REFERENCES check_ins(id) ON DELETE CASCADE,
            created_at   TEXT NOT NULL,
            UNIQUE (from_user_id, check_in_id)
        );

        CREATE INDEX IF NOT EXISTS idx_kudos_check_in ON kudos(check_in_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    info!("applied schema migration v2");
    Ok(())
}

/// Migration v3: user profiles (display names).
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id    TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            avatar_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_profiles_name ON profiles(name);",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()?;
    info!("applied schema migration v3");
    Ok(())
}
