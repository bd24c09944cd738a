//! Core error types for habitparty-core.
//!
//! The hierarchy separates the three failure families callers must tell apart:
//! store failures (surfaced as-is), validation failures (raised before any
//! write), and unique-key conflicts, which the engines turn into "already
//! done" outcomes instead of errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitparty-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True when the error was raised before any write reached the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }
}

/// Errors reported by a [`Store`](crate::storage::Store) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique key is already taken. Engines convert this into an
    /// informational outcome; it never reaches the caller as an error.
    #[error("Unique constraint already satisfied: {0}")]
    Conflict(String),

    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors, raised before anything is written.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Required text field is empty
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    /// User is not an accepted member of the challenge
    #[error("User {user_id} is not a member of challenge {challenge_id}")]
    NotAMember { challenge_id: String, user_id: String },

    /// Users are not accepted friends
    #[error("User {user_id} is not a friend of {other_id}")]
    NotFriends { user_id: String, other_id: String },

    /// Membership or friendship state does not allow the requested transition
    #[error("Invalid transition for {entity} {id}: {message}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        message: String,
    },

    /// Caller is not allowed to act on this entity
    #[error("User {user_id} may not modify {entity} {id}")]
    Forbidden {
        entity: &'static str,
        id: String,
        user_id: String,
    },
}

impl ValidationError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ValidationError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StoreError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation
                    if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    StoreError::Conflict(msg.clone().unwrap_or_else(|| code.to_string()))
                }
                _ => StoreError::QueryFailed(err.to_string()),
            },
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
