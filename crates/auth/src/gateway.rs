//! The OIDC login gateway.
//!
//! Owns the outbound challenge and drives a `LoginAttempt` through the
//! callback. Every remote failure ends in `CallbackOutcome::Failed` with a
//! login-page redirect; nothing from the authority is allowed to escape as
//! an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use oidping_core::auth::{
    authorization_url, generate_nonce, generate_state, is_flow_expired, validate_return_to,
    AuthFlowState, ChallengeParams, ClaimMapping, LoginAttempt, MappedPrincipal, OidcClient,
    OidcSettings, RedirectTarget, RemoteAuthError, TokenSet,
};
use openidconnect::PkceCodeChallenge;
use serde::Deserialize;
use url::Url;

/// Parameters the authority sends back to `/signin-oidc`, by query or form.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// An outbound challenge: where to send the browser and what to remember.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub url: Url,
    pub state: String,
    pub flow: AuthFlowState,
}

/// A validated external login, ready for the identity store.
#[derive(Debug, Clone)]
pub struct ExternalLogin {
    pub principal: MappedPrincipal,
    /// `None` unless `SaveTokens` is on.
    pub tokens: Option<TokenSet>,
    pub return_to: Option<String>,
}

#[derive(Debug)]
pub enum CallbackOutcome {
    Succeeded(ExternalLogin),
    Failed {
        cause: RemoteAuthError,
        redirect: RedirectTarget,
    },
}

pub struct OidcGateway {
    settings: Arc<OidcSettings>,
    client: Arc<dyn OidcClient>,
    mapping: ClaimMapping,
    base_url: Url,
    remote_timeout: Duration,
}

impl OidcGateway {
    pub fn new(
        settings: Arc<OidcSettings>,
        client: Arc<dyn OidcClient>,
        base_url: Url,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            settings,
            client,
            mapping: ClaimMapping::default(),
            base_url,
            remote_timeout,
        }
    }

    pub fn with_mapping(mut self, mapping: ClaimMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Build the authorization request for a new login.
    ///
    /// `return_to` is kept only if it is a safe local path.
    pub fn challenge(&self, return_to: Option<&str>) -> Challenge {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let state = generate_state();
        let nonce = generate_nonce();

        let url = authorization_url(
            &self.settings,
            &self.base_url,
            &ChallengeParams {
                state: &state,
                nonce: &nonce,
                pkce_challenge: pkce_challenge.as_str(),
            },
        );

        let flow = AuthFlowState {
            pkce_verifier: pkce_verifier.secret().to_string(),
            nonce,
            created_at: Utc::now(),
            return_to: return_to.and_then(validate_return_to).map(String::from),
        };

        Challenge { url, state, flow }
    }

    /// Complete a login from the callback parameters.
    ///
    /// `flow` is the pending login stored under `params.state` (already
    /// removed from storage) and `correlation` is the state value from the
    /// browser's correlation cookie.
    pub async fn authenticate(
        &self,
        params: CallbackParams,
        flow: Option<AuthFlowState>,
        correlation: Option<&str>,
    ) -> CallbackOutcome {
        let mut attempt = LoginAttempt::new();

        match self.run(&mut attempt, params, flow, correlation).await {
            Ok(login) => CallbackOutcome::Succeeded(login),
            Err(cause) => {
                tracing::warn!(kind = cause.kind(), error = %cause, "remote authentication failed");
                let redirect = match attempt.fail(cause.clone()) {
                    Ok(redirect) => redirect,
                    Err(transition) => {
                        tracing::error!(error = %transition, "login attempt already finished");
                        oidping_core::auth::failure_redirect(Some(&cause))
                    }
                };
                CallbackOutcome::Failed { cause, redirect }
            }
        }
    }

    async fn run(
        &self,
        attempt: &mut LoginAttempt,
        params: CallbackParams,
        flow: Option<AuthFlowState>,
        correlation: Option<&str>,
    ) -> Result<ExternalLogin, RemoteAuthError> {
        let flow = correlate(params.state.as_deref(), flow, correlation)?;

        if let Some(error) = params.error {
            return Err(authority_error(error, params.error_description));
        }

        let code = params.code.ok_or_else(|| RemoteAuthError::InvalidCode {
            error: "invalid_request".to_string(),
            description: Some("The authorization code is missing.".to_string()),
        })?;

        attempt
            .begin_exchange()
            .map_err(|_| RemoteAuthError::StateMismatch)?;

        let exchange = tokio::time::timeout(
            self.remote_timeout,
            self.client
                .exchange_code(&code, &flow.pkce_verifier, &flow.nonce),
        )
        .await
        .map_err(|_| RemoteAuthError::Timeout)??;

        let mut claims = exchange.claims;

        if self.settings.get_claims_from_user_info {
            if let Some(subject) = claims.first(oidping_core::auth::claim_types::SUBJECT) {
                let subject = subject.to_string();
                let user_info = tokio::time::timeout(
                    self.remote_timeout,
                    self.client
                        .fetch_user_info(&exchange.tokens.access_token, &subject),
                )
                .await
                .map_err(|_| RemoteAuthError::Timeout)??;
                claims.merge_user_info(user_info);
            }
        }

        let principal = self
            .mapping
            .apply(claims)
            .ok_or_else(|| RemoteAuthError::InvalidToken("ID token has no subject".to_string()))?;

        let tokens = self.settings.save_tokens.then_some(exchange.tokens);

        attempt
            .succeed()
            .map_err(|_| RemoteAuthError::StateMismatch)?;

        tracing::info!(subject = %principal.subject, "external login validated");

        Ok(ExternalLogin {
            principal,
            tokens,
            return_to: flow.return_to,
        })
    }
}

/// Check the returned state against the correlation cookie and the stored
/// flow. Missing, mismatched and expired all count as a mismatch.
fn correlate(
    state: Option<&str>,
    flow: Option<AuthFlowState>,
    correlation: Option<&str>,
) -> Result<AuthFlowState, RemoteAuthError> {
    let state = state.ok_or(RemoteAuthError::StateMismatch)?;
    if correlation != Some(state) {
        return Err(RemoteAuthError::StateMismatch);
    }

    let flow = flow.ok_or(RemoteAuthError::StateMismatch)?;
    if is_flow_expired(&flow, Utc::now()) {
        return Err(RemoteAuthError::StateMismatch);
    }
    Ok(flow)
}

fn authority_error(error: String, description: Option<String>) -> RemoteAuthError {
    if error == "access_denied" {
        RemoteAuthError::ConsentDenied { description }
    } else {
        RemoteAuthError::InvalidCode { error, description }
    }
}
