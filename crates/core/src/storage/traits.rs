use async_trait::async_trait;
use uuid::Uuid;

use super::{LocalUser, Result};

/// Repository for local user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<LocalUser>>;

    /// Gets a user by external login (provider scheme + subject).
    async fn get_user_by_login(&self, provider: &str, subject: &str) -> Result<Option<LocalUser>>;

    /// Creates a new user.
    async fn create_user(&self, user: &LocalUser) -> Result<()>;

    /// Updates an existing user.
    async fn update_user(&self, user: &LocalUser) -> Result<()>;

    /// Stores the pending confirmation code for a user, replacing any older one.
    async fn store_confirmation_code(&self, user_id: Uuid, code: &str) -> Result<()>;

    /// Marks the user confirmed if `code` matches. Returns whether it did.
    async fn confirm_account(&self, user_id: Uuid, code: &str) -> Result<bool>;
}
