use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "habitparty", version, about = "Habits, streaks and party challenges")]
struct Cli {
    /// Act as this user instead of the configured user_id
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    acting_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Daily check-ins
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Streaks and consistency views
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Party challenges
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Friends and friend requests
    Friend {
        #[command(subcommand)]
        action: commands::friend::FriendAction,
    },
    /// Display names
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Friends' activity and kudos
    Feed {
        #[command(subcommand)]
        action: commands::feed::FeedAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn run(cli: Cli) -> commands::CmdResult {
    let user = cli.acting_user;
    match cli.command {
        Commands::Habit { action } => commands::habit::run(action, &Context::open(user)?),
        Commands::Checkin { action } => commands::checkin::run(action, &Context::open(user)?),
        Commands::Stats { action } => commands::stats::run(action, &Context::open(user)?),
        Commands::Challenge { action } => {
            commands::challenge::run(action, &Context::open(user)?)
        }
        Commands::Friend { action } => commands::friend::run(action, &Context::open(user)?),
        Commands::Profile { action } => commands::profile::run(action, &Context::open(user)?),
        Commands::Feed { action } => commands::feed::run(action, &Context::open(user)?),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "habitparty=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_challenge_create_with_invites() {
        let cli = Cli::try_parse_from([
            "habitparty",
            "challenge",
            "create",
            "Morning run",
            "--habit",
            "Run",
            "--days",
            "14",
            "--invite",
            "bia",
            "--invite",
            "caio",
        ])
        .unwrap();
        match cli.command {
            Commands::Challenge {
                action:
                    commands::challenge::ChallengeAction::Create {
                        title,
                        habit,
                        days,
                        invitees,
                    },
            } => {
                assert_eq!(title, "Morning run");
                assert_eq!(habit, "Run");
                assert_eq!(days, 14);
                assert_eq!(invitees, vec!["bia".to_string(), "caio".to_string()]);
            }
            _ => panic!("expected challenge create"),
        }
    }

    #[test]
    fn acting_user_is_global() {
        let cli = Cli::try_parse_from(["habitparty", "feed", "show", "--as", "bia"]).unwrap();
        assert_eq!(cli.acting_user.as_deref(), Some("bia"));
    }

    #[test]
    fn stats_day_rejects_bad_dates() {
        assert!(Cli::try_parse_from(["habitparty", "stats", "day", "2024-13-40"]).is_err());
        assert!(Cli::try_parse_from(["habitparty", "stats", "day", "2024-02-29"]).is_ok());
    }

    #[test]
    fn friend_request_takes_id_or_name() {
        assert!(Cli::try_parse_from(["habitparty", "friend", "request", "bia"]).is_ok());
        assert!(Cli::try_parse_from(["habitparty", "friend", "request", "--name", "Bia"]).is_ok());
        assert!(Cli::try_parse_from(["habitparty", "friend", "request"]).is_err());
        assert!(
            Cli::try_parse_from(["habitparty", "friend", "request", "bia", "--name", "Bia"])
                .is_err()
        );
    }

    #[test]
    fn stats_grid_days_is_bounded() {
        assert!(Cli::try_parse_from(["habitparty", "stats", "grid", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["habitparty", "stats", "grid", "--days", "999999"]).is_err());
        assert!(Cli::try_parse_from(["habitparty", "stats", "grid", "--days", "3660"]).is_ok());
    }
}
