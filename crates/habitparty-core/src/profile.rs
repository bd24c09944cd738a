//! User profiles: display names for ids shown in challenges, invites and the feed.

use std::collections::HashMap;

use tracing::info;

use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::model::Profile;
use crate::storage::Store;

pub struct ProfileBook<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> ProfileBook<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create or update the profile of `user_id`.
    ///
    /// An empty `avatar_url` clears it.
    pub fn set_profile(
        &self,
        user_id: &str,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }
        let now = self.clock.now();
        let created_at = self
            .store
            .get_profile(user_id)?
            .map_or(now, |existing| existing.created_at);
        let profile = Profile {
            user_id: user_id.to_string(),
            name: name.to_string(),
            avatar_url: avatar_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            created_at,
            updated_at: now,
        };
        self.store.upsert_profile(&profile)?;
        info!(user_id, "profile updated");
        Ok(profile)
    }

    pub fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.store.get_profile(user_id)?)
    }

    /// Display names by user id. Users without a profile are absent.
    pub fn display_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        Ok(self
            .store
            .list_profiles(user_ids)?
            .into_iter()
            .map(|p| (p.user_id, p.name))
            .collect())
    }

    /// Profiles whose name contains `query` (case-insensitive), without `exclude_id`.
    pub fn find_by_name(&self, query: &str, exclude_id: &str) -> Result<Vec<Profile>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }
        Ok(self
            .store
            .search_profiles(query)?
            .into_iter()
            .filter(|p| p.user_id != exclude_id)
            .collect())
    }

    /// The single profile `query` names for `searcher_id`.
    ///
    /// An exact name match (ignoring case) wins over partial matches; several
    /// partial matches without an exact one are ambiguous.
    pub fn resolve_name(&self, query: &str, searcher_id: &str) -> Result<Profile> {
        let mut matches = self.find_by_name(query, searcher_id)?;
        let query = query.trim();
        if let Some(pos) = matches
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(query))
        {
            return Ok(matches.swap_remove(pos));
        }
        match matches.len() {
            0 => Err(ValidationError::not_found("profile", query).into()),
            1 => Ok(matches.swap_remove(0)),
            n => Err(ValidationError::InvalidValue {
                field: "name",
                message: format!("'{query}' matches {n} profiles"),
            }
            .into()),
        }
    }
}
