//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oidping_core::auth::{
    load, ClaimSet, CodeExchange, EmailSender, MapSource, OidcClient, RemoteAuthError,
    RemoteResult, SchemeRegistry, TokenSet,
};
use oidping_core::storage::LocalUser;
use url::Url;

use crate::config::AuthConfig;
use crate::sessions::InMemorySessionStore;
use crate::users::InMemoryUserStore;
use crate::AuthState;

/// Keeps every confirmation link instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingEmailSender {
    links: Mutex<Vec<String>>,
}

impl RecordingEmailSender {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_confirmation_link(
        &self,
        _user: &LocalUser,
        link: &str,
    ) -> oidping_core::auth::Result<()> {
        self.links.lock().unwrap().push(link.to_string());
        Ok(())
    }
}

/// Authority that answers every code exchange the same way.
pub(crate) struct ScriptedClient {
    exchange: RemoteResult<CodeExchange>,
}

impl ScriptedClient {
    pub(crate) fn returning(claims: ClaimSet) -> Arc<Self> {
        Arc::new(Self {
            exchange: Ok(CodeExchange {
                tokens: TokenSet {
                    id_token: "id-token".to_string(),
                    access_token: "access-token".to_string(),
                    refresh_token: None,
                    expires_at: None,
                },
                claims,
            }),
        })
    }

    pub(crate) fn failing(err: RemoteAuthError) -> Arc<Self> {
        Arc::new(Self { exchange: Err(err) })
    }
}

#[async_trait]
impl OidcClient for ScriptedClient {
    async fn exchange_code(
        &self,
        _code: &str,
        _pkce_verifier: &str,
        _nonce: &str,
    ) -> RemoteResult<CodeExchange> {
        self.exchange.clone()
    }

    async fn fetch_user_info(&self, _access_token: &str, _subject: &str) -> RemoteResult<ClaimSet> {
        Ok(ClaimSet::new())
    }
}

/// State over in-memory stores with user info lookups disabled.
pub(crate) fn state_with_client(
    client: Arc<dyn OidcClient>,
) -> (AuthState, Arc<RecordingEmailSender>) {
    let settings = load(
        &MapSource::new()
            .with("OpenIdConnect:Authority", "https://idp.example.com")
            .with("OpenIdConnect:ClientId", "oidping")
            .with("OpenIdConnect:ClientSecret", "secret")
            .with("OpenIdConnect:GetClaimsFromUserInfoEndpoint", "false"),
    )
    .unwrap();

    let mut config = AuthConfig::new(Url::parse("http://localhost:3000").unwrap());
    config.cookie_secure = false;

    let emails = Arc::new(RecordingEmailSender::default());
    let state = AuthState::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryUserStore::new()),
        settings,
        client,
        SchemeRegistry::standard(),
        config,
    )
    .with_email_sender(emails.clone());

    (state, emails)
}

pub(crate) fn recording_state() -> (AuthState, Arc<RecordingEmailSender>) {
    state_with_client(ScriptedClient::failing(RemoteAuthError::NetworkFailure(
        "no authority in tests".to_string(),
    )))
}
