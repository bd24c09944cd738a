//! Friendship graph.
//!
//! A friendship row is directional while pending (`user_id` asked
//! `friend_id`) and symmetric once accepted. Every lookup checks both
//! orientations, and the store keeps at most one row per unordered pair.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::model::{new_id, Friendship, FriendshipStatus};
use crate::profile::ProfileBook;
use crate::storage::Store;

/// Result of [`FriendGraph::request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FriendRequestOutcome {
    /// A new pending request was written.
    Requested(Friendship),
    /// The other user had already asked; their request is now accepted.
    Accepted(Friendship),
    AlreadyFriends,
    /// A pending request from the same sender already exists.
    AlreadyRequested,
}

pub struct FriendGraph<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> FriendGraph<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// True when an accepted friendship exists in either orientation.
    pub fn are_friends(&self, a: &str, b: &str) -> Result<bool> {
        Ok(self
            .store
            .find_friendship(a, b)?
            .is_some_and(|f| f.status == FriendshipStatus::Accepted))
    }

    /// Accepted friends of `user_id`, sorted.
    pub fn friends_of(&self, user_id: &str) -> Result<Vec<String>> {
        let friends: BTreeSet<String> = self
            .store
            .list_friendships(user_id, Some(FriendshipStatus::Accepted))?
            .iter()
            .filter_map(|f| f.other(user_id))
            .map(str::to_string)
            .collect();
        Ok(friends.into_iter().collect())
    }

    /// Friends of `user_id` that hold no member row (pending or accepted)
    /// for `challenge_id`.
    pub fn eligible_invitees(&self, user_id: &str, challenge_id: &str) -> Result<Vec<String>> {
        let taken: HashSet<String> = self
            .store
            .list_members(challenge_id)?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        let eligible: Vec<String> = self
            .friends_of(user_id)?
            .into_iter()
            .filter(|friend| !taken.contains(friend))
            .collect();
        debug!(user_id, challenge_id, count = eligible.len(), "eligible invitees");
        Ok(eligible)
    }

    /// Send a friend request from `from` to `to`.
    pub fn request(&self, from: &str, to: &str) -> Result<FriendRequestOutcome> {
        if to.trim().is_empty() {
            return Err(ValidationError::EmptyField("friend_id").into());
        }
        if from == to {
            return Err(ValidationError::InvalidValue {
                field: "friend_id",
                message: "cannot befriend yourself".into(),
            }
            .into());
        }

        if let Some(existing) = self.store.find_friendship(from, to)? {
            return self.resolve_existing(from, existing);
        }

        let friendship = Friendship {
            id: new_id(),
            user_id: from.to_string(),
            friend_id: to.to_string(),
            status: FriendshipStatus::Pending,
            created_at: self.clock.now(),
        };
        match self.store.insert_friendship(&friendship) {
            Ok(()) => {
                info!(from, to, "friend request sent");
                Ok(FriendRequestOutcome::Requested(friendship))
            }
            // The other side wrote a row between our lookup and insert
            Err(e) if e.is_conflict() => match self.store.find_friendship(from, to)? {
                Some(existing) => self.resolve_existing(from, existing),
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Send a friend request to the user whose profile name matches `query`.
    ///
    /// See [`ProfileBook::resolve_name`] for how the name is matched.
    pub fn request_by_name(&self, from: &str, query: &str) -> Result<FriendRequestOutcome> {
        let profile = ProfileBook::new(self.store, self.clock).resolve_name(query, from)?;
        debug!(from, query, to = %profile.user_id, "friend name resolved");
        self.request(from, &profile.user_id)
    }

    fn resolve_existing(&self, from: &str, existing: Friendship) -> Result<FriendRequestOutcome> {
        match existing.status {
            FriendshipStatus::Accepted => Ok(FriendRequestOutcome::AlreadyFriends),
            FriendshipStatus::Pending if existing.user_id == from => {
                debug!(from, friendship_id = %existing.id, "request already pending");
                Ok(FriendRequestOutcome::AlreadyRequested)
            }
            FriendshipStatus::Pending => {
                self.store.accept_friendship(&existing.id)?;
                info!(friendship_id = %existing.id, "crossed requests, accepted");
                Ok(FriendRequestOutcome::Accepted(Friendship {
                    status: FriendshipStatus::Accepted,
                    ..existing
                }))
            }
        }
    }

    /// Accept an incoming request. Only the addressee may accept; accepting
    /// twice is a no-op.
    pub fn accept(&self, user_id: &str, friendship_id: &str) -> Result<Friendship> {
        let friendship = self
            .store
            .get_friendship(friendship_id)?
            .ok_or_else(|| ValidationError::not_found("friendship", friendship_id))?;

        if friendship.friend_id != user_id {
            return Err(ValidationError::Forbidden {
                entity: "friendship",
                id: friendship_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        if friendship.status == FriendshipStatus::Accepted {
            return Ok(friendship);
        }

        self.store.accept_friendship(friendship_id)?;
        info!(friendship_id, user_id, "friend request accepted");
        Ok(Friendship {
            status: FriendshipStatus::Accepted,
            ..friendship
        })
    }

    /// Unfriend, or cancel/decline a pending request. Returns `false` when
    /// there was nothing to remove.
    pub fn remove(&self, user_id: &str, other_id: &str) -> Result<bool> {
        let Some(friendship) = self.store.find_friendship(user_id, other_id)? else {
            return Ok(false);
        };
        let removed = self.store.delete_friendship(&friendship.id)?;
        if removed {
            info!(user_id, other_id, "friendship removed");
        }
        Ok(removed)
    }

    /// Pending requests addressed to `user_id`, oldest first.
    pub fn pending_requests(&self, user_id: &str) -> Result<Vec<Friendship>> {
        Ok(self
            .store
            .list_friendships(user_id, Some(FriendshipStatus::Pending))?
            .into_iter()
            .filter(|f| f.friend_id == user_id)
            .collect())
    }
}
