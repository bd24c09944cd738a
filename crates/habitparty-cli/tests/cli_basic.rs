//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway HABITPARTY_HOME and
//! verify the JSON it prints.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_habitparty"))
        .env("HABITPARTY_HOME", home)
        .env_remove("HABITPARTY_ENV")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_config_defaults_and_set() {
    let home = tempfile::tempdir().unwrap();

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "calendar.week_starts_on"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "monday");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "feed.limit", "5"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "feed.limit"]);
    assert_eq!(stdout.trim(), "5");

    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "feed.nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));
}

#[test]
fn test_habit_check_in_flow() {
    let home = tempfile::tempdir().unwrap();

    let habit = run_json(home.path(), &["habit", "add", "Read", "--goal-minutes", "20"]);
    let habit_id = habit["id"].as_str().unwrap().to_string();

    let first = run_json(home.path(), &["checkin", "done", &habit_id]);
    assert_eq!(first["outcome"], "created");
    let second = run_json(home.path(), &["checkin", "done", &habit_id]);
    assert_eq!(second["outcome"], "already_checked_in");

    let list = run_json(home.path(), &["habit", "list"]);
    assert_eq!(list[0]["checked_today"], true);
    assert_eq!(list[0]["streak"]["current"], 1);

    let summary = run_json(home.path(), &["stats", "summary"]);
    assert_eq!(summary["today_checked"], 1);

    let (_, _, code) = run_cli(home.path(), &["checkin", "undo", &habit_id]);
    assert_eq!(code, 0);
    let list = run_json(home.path(), &["checkin", "list"]);
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_party_between_two_users() {
    let home = tempfile::tempdir().unwrap();

    run_json(home.path(), &["--as", "ana", "friend", "request", "bia"]);
    let accepted = run_json(home.path(), &["--as", "bia", "friend", "request", "ana"]);
    assert_eq!(accepted["outcome"], "accepted");

    let challenge = run_json(
        home.path(),
        &["--as", "ana", "challenge", "create", "Run club", "--days", "7", "--invite", "bia"],
    );
    let challenge_id = challenge["id"].as_str().unwrap().to_string();

    let invites = run_json(home.path(), &["--as", "bia", "challenge", "invites"]);
    assert_eq!(invites[0]["challenge_id"], challenge_id.as_str());

    run_json(home.path(), &["--as", "bia", "challenge", "accept", &challenge_id]);
    let log = run_json(home.path(), &["--as", "bia", "challenge", "log", &challenge_id]);
    assert_eq!(log["outcome"], "logged");

    let view = run_json(home.path(), &["--as", "ana", "challenge", "show", &challenge_id]);
    assert_eq!(view["current_day"], 1);
    assert_eq!(view["members"].as_array().unwrap().len(), 2);
    assert_eq!(view["members"][0]["user_id"], "ana");
}

#[test]
fn test_invalid_input_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["checkin", "done", "missing-habit"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_check_in_on_someone_elses_habit_fails() {
    let home = tempfile::tempdir().unwrap();

    let habit = run_json(home.path(), &["--as", "ana", "habit", "add", "Read"]);
    let habit_id = habit["id"].as_str().unwrap().to_string();

    let (_, stderr, code) = run_cli(home.path(), &["--as", "bia", "checkin", "done", &habit_id]);
    assert_ne!(code, 0);
    assert!(stderr.contains("may not modify"));
    let (_, _, code) = run_cli(home.path(), &["--as", "bia", "checkin", "undo", &habit_id]);
    assert_ne!(code, 0);

    let list = run_json(home.path(), &["--as", "ana", "checkin", "list"]);
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_profiles_and_friend_request_by_name() {
    let home = tempfile::tempdir().unwrap();

    run_json(home.path(), &["--as", "ana", "profile", "set", "Ana"]);
    let bia = run_json(home.path(), &["--as", "bia", "profile", "set", "Beatriz"]);
    assert_eq!(bia["name"], "Beatriz");

    let found = run_json(home.path(), &["--as", "ana", "profile", "find", "bea"]);
    assert_eq!(found[0]["user_id"], "bia");

    let requested = run_json(home.path(), &["--as", "ana", "friend", "request", "--name", "beatriz"]);
    assert_eq!(requested["outcome"], "requested");
    let accepted = run_json(home.path(), &["--as", "bia", "friend", "request", "--name", "ana"]);
    assert_eq!(accepted["outcome"], "accepted");

    let habit = run_json(home.path(), &["--as", "bia", "habit", "add", "Stretch"]);
    run_json(
        home.path(),
        &["--as", "bia", "checkin", "done", habit["id"].as_str().unwrap()],
    );
    let feed = run_json(home.path(), &["--as", "ana", "feed", "show"]);
    assert_eq!(feed[0]["owner_name"], "Beatriz");

    let (_, stderr, code) = run_cli(home.path(), &["--as", "ana", "profile", "show", "caio"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no profile"));
}
