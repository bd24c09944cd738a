pub mod challenge;
pub mod checkin;
pub mod config;
pub mod feed;
pub mod friend;
pub mod habit;
pub mod profile;
pub mod stats;

use habitparty_core::{Config, Database, SystemClock};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Store, config and identity shared by the data commands.
pub struct Context {
    pub db: Database,
    pub config: Config,
    pub clock: SystemClock,
    pub user_id: String,
}

impl Context {
    /// Open the default database and config. `acting_user` overrides the
    /// configured identity for this invocation.
    pub fn open(acting_user: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Database::open()?;
        let user_id = acting_user.unwrap_or_else(|| config.user_id.clone());
        tracing::debug!(user_id = %user_id, "context opened");
        Ok(Self {
            clock: config.clock(),
            db,
            config,
            user_id,
        })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
