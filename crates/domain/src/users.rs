//! User directory collaborator.
//!
//! Identity, sessions, and roles are someone else's problem; the engine
//! only consumes [`UserDirectory::user_exists`]. Registration and lookup
//! exist for the thin user endpoints that sit in front of the directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use common::UserId;

use crate::Result;

/// A registered user, as much of one as the marketplace needs.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// The user collaborator interface.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns true if the user exists. The reservation engine depends on
    /// this check alone.
    async fn user_exists(&self, user_id: UserId) -> Result<bool>;

    /// Registers a user and returns the profile.
    async fn register(&self, name: String, email: String) -> Result<UserProfile>;

    /// Looks up a profile by ID.
    async fn get(&self, user_id: UserId) -> Result<Option<UserProfile>>;
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn user_exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self.users.read().await.contains_key(&user_id))
    }

    async fn register(&self, name: String, email: String) -> Result<UserProfile> {
        let profile = UserProfile {
            id: UserId::new(),
            name,
            email,
        };
        self.users.write().await.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}
