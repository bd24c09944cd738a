//! Friends' recent check-ins and kudos.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::friends::FriendGraph;
use crate::model::{new_id, CheckIn, Kudos};
use crate::profile::ProfileBook;
use crate::storage::Store;

/// Default number of feed items.
pub const DEFAULT_FEED_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub check_in: CheckIn,
    /// Profile name of the check-in owner, if they set one.
    pub owner_name: Option<String>,
    /// `None` if the habit was deleted after the check-in was read.
    pub habit_name: Option<String>,
    pub kudos_count: usize,
    pub has_given_kudos: bool,
}

/// Result of [`ActivityFeed::give_kudos`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KudosOutcome {
    Given(Kudos),
    AlreadyGiven,
}

pub struct ActivityFeed<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> ActivityFeed<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Latest check-ins of `viewer_id`'s friends, newest first.
    pub fn friend_feed(&self, viewer_id: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let friends = FriendGraph::new(self.store, self.clock).friends_of(viewer_id)?;
        let check_ins = self.store.recent_check_ins(&friends, limit)?;
        let owner_names = ProfileBook::new(self.store, self.clock).display_names(&friends)?;

        let ids: Vec<String> = check_ins.iter().map(|c| c.id.clone()).collect();
        let mut kudos_by_check_in: HashMap<String, Vec<Kudos>> = HashMap::new();
        for kudos in self.store.list_kudos(&ids)? {
            kudos_by_check_in
                .entry(kudos.check_in_id.clone())
                .or_default()
                .push(kudos);
        }

        let mut habit_names: HashMap<String, Option<String>> = HashMap::new();
        let mut items = Vec::with_capacity(check_ins.len());
        for check_in in check_ins {
            let habit_name = match habit_names.get(&check_in.habit_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.store.get_habit(&check_in.habit_id)?.map(|h| h.name);
                    habit_names.insert(check_in.habit_id.clone(), name.clone());
                    name
                }
            };
            let kudos = kudos_by_check_in
                .get(&check_in.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            items.push(FeedItem {
                owner_name: owner_names.get(&check_in.owner_id).cloned(),
                habit_name,
                kudos_count: kudos.len(),
                has_given_kudos: kudos.iter().any(|k| k.from_user_id == viewer_id),
                check_in,
            });
        }

        debug!(viewer_id, friends = friends.len(), items = items.len(), "feed built");
        Ok(items)
    }

    /// Acknowledge a friend's check-in. One kudos per user and check-in.
    pub fn give_kudos(&self, from_user_id: &str, check_in_id: &str) -> Result<KudosOutcome> {
        let check_in = self
            .store
            .get_check_in(check_in_id)?
            .ok_or_else(|| ValidationError::not_found("check-in", check_in_id))?;

        if check_in.owner_id == from_user_id {
            return Err(ValidationError::InvalidValue {
                field: "check_in_id",
                message: "cannot give kudos on your own check-in".into(),
            }
            .into());
        }
        if !FriendGraph::new(self.store, self.clock).are_friends(from_user_id, &check_in.owner_id)? {
            return Err(ValidationError::NotFriends {
                user_id: from_user_id.to_string(),
                other_id: check_in.owner_id,
            }
            .into());
        }

        let kudos = Kudos {
            id: new_id(),
            from_user_id: from_user_id.to_string(),
            to_user_id: check_in.owner_id,
            check_in_id: check_in.id,
            created_at: self.clock.now(),
        };
        match self.store.insert_kudos(&kudos) {
            Ok(()) => {
                info!(from_user_id, check_in_id, "kudos given");
                Ok(KudosOutcome::Given(kudos))
            }
            Err(e) if e.is_conflict() => Ok(KudosOutcome::AlreadyGiven),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::habits::{CheckInOutcome, HabitTracker};
    use crate::storage::Database;

    fn setup() -> (Database, FixedClock) {
        (Database::open_memory().unwrap(), FixedClock::ymd(2024, 1, 8))
    }

    fn befriend(db: &Database, clock: &FixedClock, a: &str, b: &str) {
        let graph = FriendGraph::new(db, clock);
        graph.request(a, b).unwrap();
        graph.request(b, a).unwrap();
    }

    fn checked_in(db: &Database, clock: &FixedClock, owner: &str, habit: &str) -> CheckIn {
        let tracker = HabitTracker::new(db, clock);
        let habit = tracker.add_habit(owner, habit, "", 0).unwrap();
        match tracker.check_in(owner, &habit.id).unwrap() {
            CheckInOutcome::Created(check_in) => check_in,
            CheckInOutcome::AlreadyCheckedIn => panic!("fresh habit already checked in"),
        }
    }

    #[test]
    fn feed_shows_only_friends() {
        let (db, clock) = setup();
        befriend(&db, &clock, "ana", "bia");
        FriendGraph::new(&db, &clock).request("ana", "caio").unwrap();

        let bia = checked_in(&db, &clock, "bia", "Read");
        checked_in(&db, &clock, "caio", "Run");
        checked_in(&db, &clock, "ana", "Swim");

        let feed = ActivityFeed::new(&db, &clock).friend_feed("ana", DEFAULT_FEED_LIMIT).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].check_in, bia);
        assert_eq!(feed[0].habit_name.as_deref(), Some("Read"));
        assert_eq!(feed[0].kudos_count, 0);
        assert!(!feed[0].has_given_kudos);
        assert_eq!(feed[0].owner_name, None);
    }

    #[test]
    fn feed_items_carry_owner_names() {
        let (db, clock) = setup();
        befriend(&db, &clock, "ana", "bia");
        ProfileBook::new(&db, &clock)
            .set_profile("bia", "Beatriz", None)
            .unwrap();
        checked_in(&db, &clock, "bia", "Read");

        let feed = ActivityFeed::new(&db, &clock).friend_feed("ana", DEFAULT_FEED_LIMIT).unwrap();
        assert_eq!(feed[0].owner_name.as_deref(), Some("Beatriz"));
    }

    #[test]
    fn feed_respects_limit() {
        let (db, clock) = setup();
        befriend(&db, &clock, "ana", "bia");
        for name in ["Read", "Run", "Swim"] {
            checked_in(&db, &clock, "bia", name);
        }
        let feed = ActivityFeed::new(&db, &clock);
        assert_eq!(feed.friend_feed("ana", 2).unwrap().len(), 2);
        assert!(feed.friend_feed("ana", 0).unwrap().is_empty());
        assert!(feed.friend_feed("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn kudos_once_per_user() {
        let (db, clock) = setup();
        befriend(&db, &clock, "ana", "bia");
        befriend(&db, &clock, "caio", "bia");
        let check_in = checked_in(&db, &clock, "bia", "Read");
        let feed = ActivityFeed::new(&db, &clock);

        assert!(matches!(
            feed.give_kudos("ana", &check_in.id).unwrap(),
            KudosOutcome::Given(_)
        ));
        assert_eq!(
            feed.give_kudos("ana", &check_in.id).unwrap(),
            KudosOutcome::AlreadyGiven
        );
        feed.give_kudos("caio", &check_in.id).unwrap();

        let items = feed.friend_feed("ana", 10).unwrap();
        assert_eq!(items[0].kudos_count, 2);
        assert!(items[0].has_given_kudos);
    }

    #[test]
    fn kudos_rules() {
        let (db, clock) = setup();
        let own = checked_in(&db, &clock, "ana", "Read");
        let stranger = checked_in(&db, &clock, "zed", "Run");
        let feed = ActivityFeed::new(&db, &clock);

        assert!(feed.give_kudos("ana", &own.id).unwrap_err().is_validation());
        assert!(feed.give_kudos("ana", &stranger.id).unwrap_err().is_validation());
        assert!(feed.give_kudos("ana", "missing").unwrap_err().is_validation());
    }
}
