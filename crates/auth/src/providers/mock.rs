//! Mock OIDC client for development and testing.
//!
//! Works with the mock IdP server: authorization codes are base64 JSON grants
//! that carry the user the developer typed in, so no token endpoint is needed.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use oidping_core::auth::{
    claim_types, ClaimSet, CodeExchange, OidcClient, RemoteAuthError, RemoteResult, TokenSet,
};
use serde::{Deserialize, Serialize};

/// What the mock IdP encodes into an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MockGrant {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub nonce: String,
}

impl MockGrant {
    pub fn encode(&self) -> String {
        // Serializing a plain struct of strings cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(code: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(code).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn claims(&self) -> ClaimSet {
        let mut claims = ClaimSet::new()
            .with(claim_types::SUBJECT, &self.sub)
            .with(claim_types::EMAIL, &self.email)
            .with(claim_types::EMAIL_VERIFIED, self.email_verified.to_string());
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            claims.push(claim_types::NAME, name);
        }
        for role in &self.roles {
            claims.push(claim_types::ROLE, role);
        }
        claims
    }
}

/// `OidcClient` that decodes mock IdP codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OidcClient for MockProvider {
    async fn exchange_code(
        &self,
        code: &str,
        _pkce_verifier: &str,
        nonce: &str,
    ) -> RemoteResult<CodeExchange> {
        let grant = MockGrant::decode(code).ok_or_else(|| RemoteAuthError::InvalidCode {
            error: "invalid_grant".to_string(),
            description: Some("Unknown authorization code.".to_string()),
        })?;

        if grant.nonce != nonce {
            return Err(RemoteAuthError::InvalidToken("nonce mismatch".to_string()));
        }

        let tokens = TokenSet {
            id_token: format!("mock-id.{code}"),
            access_token: code.to_string(),
            refresh_token: None,
            expires_at: None,
        };

        Ok(CodeExchange {
            tokens,
            claims: grant.claims(),
        })
    }

    async fn fetch_user_info(&self, access_token: &str, subject: &str) -> RemoteResult<ClaimSet> {
        let grant = MockGrant::decode(access_token)
            .ok_or_else(|| RemoteAuthError::NetworkFailure("userinfo returned 401".to_string()))?;

        if grant.sub != subject {
            return Err(RemoteAuthError::InvalidToken(
                "userinfo subject does not match the ID token".to_string(),
            ));
        }
        Ok(grant.claims())
    }
}
