use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cryptographically random session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tokens returned by the authority's token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("id_token", &"[redacted]")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authenticated local session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: String,
    /// Name of the scheme the session was signed into.
    pub scheme: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Present only when the gateway is configured to save tokens.
    pub tokens: Option<TokenSet>,
}

/// PKCE, nonce and return URL stored between challenge and callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFlowState {
    pub pkce_verifier: String,
    pub nonce: String,
    pub created_at: DateTime<Utc>,
    /// URL to redirect to after successful authentication.
    pub return_to: Option<String>,
}
