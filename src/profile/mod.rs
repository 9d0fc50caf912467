//! User profile read/update surface.

pub mod editor;
pub mod store;

pub use self::editor::{Notice, NoticeKind, ProfileEditor};
pub use self::store::ProfileStore;

use crate::storage::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, alias = "lastLogin")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::Invalid("name must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(ProfileError::Invalid("email must be an address"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile: {0}")]
    Invalid(&'static str),

    #[error("no profile for {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists profile edits. Returns the profile as stored.
#[async_trait::async_trait]
pub trait ProfileUpdater: Send + Sync {
    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ProfileError>;
}
