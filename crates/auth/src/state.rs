//! Application state for auth.

use std::sync::Arc;

use axum::extract::FromRef;
use oidping_core::auth::{
    EmailSender, OidcClient, OidcSettings, SchemeRegistry, SessionRepository, SignInPolicy,
};
use oidping_core::storage::UserRepository;

use crate::config::AuthConfig;
use crate::email::NoOpEmailSender;
use crate::error::AuthError;
use crate::gateway::OidcGateway;

/// Shared state for auth handlers and extractors.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionRepository>,
    pub users: Arc<dyn UserRepository>,
    pub email: Arc<dyn EmailSender>,
    pub gateway: Arc<OidcGateway>,
    pub schemes: Arc<SchemeRegistry>,
    pub policy: SignInPolicy,
    pub config: AuthConfig,
}

impl AuthState {
    /// Assemble state around an already built OIDC client.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        settings: OidcSettings,
        client: Arc<dyn OidcClient>,
        schemes: SchemeRegistry,
        config: AuthConfig,
    ) -> Self {
        let gateway = OidcGateway::new(
            Arc::new(settings),
            client,
            config.base_url.clone(),
            config.remote_timeout,
        );

        Self {
            sessions,
            users,
            email: Arc::new(NoOpEmailSender),
            gateway: Arc::new(gateway),
            schemes: Arc::new(schemes),
            policy: SignInPolicy::default(),
            config,
        }
    }

    /// Discover the configured authority and assemble state around it.
    ///
    /// # Errors
    ///
    /// Returns an error if OIDC discovery fails.
    #[cfg(not(feature = "mock"))]
    pub async fn connect(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        settings: OidcSettings,
        schemes: SchemeRegistry,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let client = crate::providers::OpenIdProvider::discover(
            &settings,
            &config.base_url,
            config.remote_timeout,
        )
        .await?;

        Ok(Self::new(
            sessions,
            users,
            settings,
            Arc::new(client),
            schemes,
            config,
        ))
    }

    /// Assemble state around the mock provider for development.
    ///
    /// The authority should point at the mock IdP (e.g. `http://localhost:3001`).
    #[cfg(feature = "mock")]
    pub async fn connect(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        settings: OidcSettings,
        schemes: SchemeRegistry,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        tracing::warn!(authority = %settings.authority, "using mock OIDC provider");

        Ok(Self::new(
            sessions,
            users,
            settings,
            Arc::new(crate::providers::MockProvider::new()),
            schemes,
            config,
        ))
    }

    pub fn with_email_sender(mut self, email: Arc<dyn EmailSender>) -> Self {
        self.email = email;
        self
    }

    pub fn with_policy(mut self, policy: SignInPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cookie carrying the local session id.
    pub fn session_cookie_name(&self) -> String {
        self.config
            .cookie_name(&self.schemes.default_authenticate().name)
    }

    /// Short-lived cookie binding the browser to a pending login.
    pub fn correlation_cookie_name(&self) -> String {
        self.config.cookie_name(&self.schemes.default_sign_in().name)
    }
}

/// Allows AuthState to be extracted from a parent state.
impl<S> FromRef<S> for AuthState
where
    S: AsRef<AuthState>,
{
    fn from_ref(state: &S) -> Self {
        state.as_ref().clone()
    }
}
