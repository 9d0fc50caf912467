//! SQLite-backed profile persistence.

use super::{ProfileError, ProfileUpdater, UserProfile};
use crate::storage::{fetch, to_row, Query, RecordStore, Table};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn RecordStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, email: &str) -> Result<UserProfile, ProfileError> {
        let mut rows: Vec<UserProfile> = fetch(
            self.store.as_ref(),
            Query::table(Table::Profiles).eq("email", email).limit(1),
        )
        .await?;
        rows.pop().ok_or_else(|| ProfileError::NotFound(email.to_string()))
    }
}

#[async_trait::async_trait]
impl ProfileUpdater for ProfileStore {
    /// Update the profile keyed by its email, creating it on first save.
    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ProfileError> {
        profile.validate()?;

        let mut row = to_row(profile)?;
        row.insert(
            "updated_at".into(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        let mut changes = row.clone();
        changes.remove("email");
        let changed = self
            .store
            .update(Table::Profiles, &profile.email, changes)
            .await?;
        if changed == 0 {
            self.store.insert(Table::Profiles, vec![row]).await?;
        }

        self.get(&profile.email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{temp_store, FailingStore};

    fn profile(email: &str) -> UserProfile {
        UserProfile {
            name: "Jean Martin".into(),
            email: email.into(),
            phone: Some("0601020304".into()),
            department: "Production".into(),
            role: "Chef d'équipe".into(),
            avatar: None,
            last_login: Some("2025-04-01T07:30:00Z".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let (_dir, store) = temp_store();
        let profiles = ProfileStore::new(Arc::new(store));
        let err = profiles.get("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let (_dir, store) = temp_store();
        let profiles = ProfileStore::new(Arc::new(store));

        let created = profiles.update_profile(&profile("jm@example.com")).await.unwrap();
        assert_eq!(created, profile("jm@example.com"));

        let mut edited = created.clone();
        edited.role = "Responsable maintenance".into();
        edited.phone = None;
        let stored = profiles.update_profile(&edited).await.unwrap();
        assert_eq!(stored.role, "Responsable maintenance");
        assert_eq!(stored.phone, None);
        assert_eq!(profiles.get("jm@example.com").await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let profiles = ProfileStore::new(Arc::new(FailingStore));
        let err = profiles.update_profile(&profile("jm@example.com")).await.unwrap_err();
        assert!(matches!(err, ProfileError::Store(_)));
    }
}
