//! In-memory user storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use oidping_core::storage::{LocalUser, RepositoryError, Result, UserRepository};

/// In-memory user store.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>` for thread-safe access.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, LocalUser>>>,
    confirmation_codes: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending confirmation code for a user, if any.
    pub async fn confirmation_code(&self, user_id: Uuid) -> Option<String> {
        self.confirmation_codes.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<LocalUser>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_login(&self, provider: &str, subject: &str) -> Result<Option<LocalUser>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.provider == provider && u.provider_subject == subject)
            .cloned())
    }

    async fn create_user(&self, user: &LocalUser) -> Result<()> {
        let mut users = self.users.write().await;
        let login_taken = users
            .values()
            .any(|u| u.provider == user.provider && u.provider_subject == user.provider_subject);
        if users.contains_key(&user.id) || login_taken {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "LocalUser",
                id: user.id.to_string(),
            });
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &LocalUser) -> Result<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound {
                entity_type: "LocalUser",
                id: user.id.to_string(),
            });
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn store_confirmation_code(&self, user_id: Uuid, code: &str) -> Result<()> {
        if !self.users.read().await.contains_key(&user_id) {
            return Err(RepositoryError::NotFound {
                entity_type: "LocalUser",
                id: user_id.to_string(),
            });
        }
        let mut codes = self.confirmation_codes.write().await;
        codes.insert(user_id, code.to_string());
        Ok(())
    }

    async fn confirm_account(&self, user_id: Uuid, code: &str) -> Result<bool> {
        let mut codes = self.confirmation_codes.write().await;
        if codes.get(&user_id).map(String::as_str) != Some(code) {
            return Ok(false);
        }

        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        user.email_confirmed = true;
        codes.remove(&user_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(subject: &str) -> LocalUser {
        LocalUser::new("Ada", "ada@example.com").with_login("oidc", subject)
    }

    #[tokio::test]
    async fn finds_user_by_login() {
        let store = InMemoryUserStore::new();
        let ada = user("sub-1");
        store.create_user(&ada).await.unwrap();

        let found = store.get_user_by_login("oidc", "sub-1").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ada.id));
        assert!(store
            .get_user_by_login("other", "sub-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_login_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create_user(&user("sub-1")).await.unwrap();

        let err = store.create_user(&user("sub-1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        let err = store.update_user(&user("sub-1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn confirm_with_matching_code() {
        let store = InMemoryUserStore::new();
        let ada = user("sub-1");
        store.create_user(&ada).await.unwrap();
        store.store_confirmation_code(ada.id, "code-1").await.unwrap();

        assert!(!store.confirm_account(ada.id, "wrong").await.unwrap());
        assert!(store.confirm_account(ada.id, "code-1").await.unwrap());

        let stored = store.get_user(ada.id).await.unwrap().unwrap();
        assert!(stored.email_confirmed);
        // codes are single use
        assert!(!store.confirm_account(ada.id, "code-1").await.unwrap());
    }

    #[tokio::test]
    async fn newer_code_replaces_older() {
        let store = InMemoryUserStore::new();
        let ada = user("sub-1");
        store.create_user(&ada).await.unwrap();
        store.store_confirmation_code(ada.id, "old").await.unwrap();
        store.store_confirmation_code(ada.id, "new").await.unwrap();

        assert!(!store.confirm_account(ada.id, "old").await.unwrap());
        assert_eq!(store.confirmation_code(ada.id).await.as_deref(), Some("new"));
    }
}
