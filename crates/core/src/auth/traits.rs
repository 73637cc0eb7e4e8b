use async_trait::async_trait;

use crate::storage::LocalUser;

use super::{AuthError, AuthFlowState, ClaimSet, RemoteAuthError, Session, SessionId, TokenSet};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Result type for calls to the authority.
pub type RemoteResult<T> = std::result::Result<T, RemoteAuthError>;

/// Output of a successful code exchange.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub tokens: TokenSet,
    /// Claims from the validated ID token.
    pub claims: ClaimSet,
}

/// The OIDC client capability the gateway depends on.
///
/// Token validation lives behind this trait; the gateway only sees claims.
#[async_trait]
pub trait OidcClient: Send + Sync {
    /// Exchange an authorization code at the token endpoint and validate the
    /// returned ID token against `nonce`.
    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
        nonce: &str,
    ) -> RemoteResult<CodeExchange>;

    /// Retrieve claims from the userinfo endpoint for `subject`.
    async fn fetch_user_info(&self, access_token: &str, subject: &str) -> RemoteResult<ClaimSet>;
}

/// Session storage abstraction.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Retrieve session by ID.
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Delete a specific session.
    async fn delete_session(&self, id: &SessionId) -> Result<()>;

    /// Delete all sessions for a user.
    async fn delete_user_sessions(&self, user_id: &str) -> Result<()>;

    /// Store PKCE verifier, nonce and return URL for a pending login.
    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()>;

    /// Retrieve and delete a pending login. A state can be taken once.
    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>>;
}

/// Outbound account email. Delivery itself is somebody else's problem.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_confirmation_link(&self, user: &LocalUser, link: &str) -> Result<()>;
}
