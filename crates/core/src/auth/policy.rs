use crate::storage::LocalUser;

use super::AuthError;

/// Rules checked before a local session is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInPolicy {
    pub require_confirmed_account: bool,
}

impl Default for SignInPolicy {
    fn default() -> Self {
        Self {
            require_confirmed_account: true,
        }
    }
}

impl SignInPolicy {
    /// Refuse sign-in for users the policy does not admit, regardless of how
    /// the external login went.
    pub fn check(&self, user: &LocalUser) -> Result<(), AuthError> {
        if self.require_confirmed_account && !user.email_confirmed {
            return Err(AuthError::AccountNotConfirmed);
        }
        Ok(())
    }
}
