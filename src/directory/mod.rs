//! User directory lookups
//!
//! Player names and NTRP skill levels are owned by an external user service.
//! The engine only reads them, through [`UserDirectory`].

use crate::error::{MatchError, Result};
use crate::types::{UserId, UserProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for resolving user profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a single user. `Ok(None)` means the user does not exist.
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
}

/// In-memory user directory used by the binaries and tests
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory pre-populated with the given profiles
    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Add or replace a user profile
    pub fn upsert_user(&self, profile: UserProfile) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| MatchError::internal("Failed to acquire user directory lock"))?;
        users.insert(profile.id, profile);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let users = self
            .users
            .read()
            .map_err(|_| MatchError::internal("Failed to acquire user directory lock"))?;
        Ok(users.get(&user_id).cloned())
    }
}
