use async_trait::async_trait;
use oidping_core::auth::{EmailSender, Result};
use oidping_core::storage::LocalUser;

/// Logs confirmation links instead of sending them.
///
/// Stands in until a real mail transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEmailSender;

#[async_trait]
impl EmailSender for NoOpEmailSender {
    async fn send_confirmation_link(&self, user: &LocalUser, link: &str) -> Result<()> {
        tracing::info!(user_id = %user.id, email = %user.email, %link, "account confirmation link");
        Ok(())
    }
}
