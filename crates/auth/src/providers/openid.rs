//! OIDC client backed by discovery against the configured authority.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use oidping_core::auth::{
    claim_types, redirect_uri, ClaimSet, CodeExchange, OidcClient, OidcSettings, RemoteAuthError,
    RemoteResult, TokenSet,
};
use openidconnect::{
    core::{CoreClient, CoreErrorResponseType, CoreGenderClaim, CoreProviderMetadata},
    reqwest, AccessToken, AdditionalClaims, AuthorizationCode, ClientId, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, OAuth2TokenResponse, PkceCodeVerifier,
    RedirectUrl, RequestTokenError, StandardErrorResponse, SubjectIdentifier, TokenResponse,
    UserInfoClaims,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::claims::push_json_claims;
use crate::error::AuthError;

/// `CoreClient` as returned by `from_provider_metadata`.
///
/// - HasAuthUrl = EndpointSet (always set from discovery)
/// - HasDeviceAuthUrl, HasIntrospectionUrl, HasRevocationUrl = EndpointNotSet
/// - HasTokenUrl, HasUserInfoUrl = EndpointMaybeSet (may be absent in discovery)
type ConfiguredCoreClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Non-standard userinfo claims, e.g. `role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtraClaims {
    #[serde(flatten)]
    claims: HashMap<String, Value>,
}

impl AdditionalClaims for ExtraClaims {}

/// OIDC client for the authority named in `OidcSettings`.
pub struct OpenIdProvider {
    client: ConfiguredCoreClient,
    http_client: reqwest::Client,
}

impl OpenIdProvider {
    /// Discover the authority's metadata and build a client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if:
    /// - The issuer URL is invalid
    /// - Discovery fails (network error or invalid metadata)
    /// - The redirect URI is invalid
    pub async fn discover(
        settings: &OidcSettings,
        base_url: &Url,
        connect_timeout: Duration,
    ) -> Result<Self, AuthError> {
        let issuer = settings.authority.as_str().trim_end_matches('/').to_string();
        let issuer_url = IssuerUrl::new(issuer).map_err(|e| AuthError::Provider(e.to_string()))?;

        // Redirects are never followed
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AuthError::Provider(format!("failed to build HTTP client: {e}")))?;

        let metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| AuthError::Provider(format!("discovery failed: {e}")))?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(settings.client_id.clone()),
            Some(openidconnect::ClientSecret::new(
                settings.client_secret.expose().to_string(),
            )),
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_uri(base_url).to_string())
                .map_err(|e| AuthError::Provider(e.to_string()))?,
        );

        tracing::info!(authority = %settings.authority, "OIDC metadata discovered");

        Ok(Self {
            client,
            http_client,
        })
    }
}

#[async_trait]
impl OidcClient for OpenIdProvider {
    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
        nonce: &str,
    ) -> RemoteResult<CodeExchange> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| RemoteAuthError::NetworkFailure(e.to_string()))?
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| RemoteAuthError::InvalidToken("no ID token in response".to_string()))?;

        let verifier = self.client.id_token_verifier();
        let verified = id_token
            .claims(&verifier, &Nonce::new(nonce.to_string()))
            .map_err(|e| RemoteAuthError::InvalidToken(e.to_string()))?;

        let raw_jwt = serde_json::to_value(id_token)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();

        let mut claims = ClaimSet::new().with(claim_types::SUBJECT, verified.subject().to_string());
        push_json_claims(&mut claims, jwt_payload(&raw_jwt));

        let tokens = TokenSet {
            id_token: raw_jwt,
            access_token: token_response.access_token().secret().to_string(),
            refresh_token: token_response
                .refresh_token()
                .map(|t| t.secret().to_string()),
            expires_at: token_response
                .expires_in()
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .map(|d| Utc::now() + d),
        };

        Ok(CodeExchange { tokens, claims })
    }

    async fn fetch_user_info(&self, access_token: &str, subject: &str) -> RemoteResult<ClaimSet> {
        let request = match self.client.user_info(
            AccessToken::new(access_token.to_string()),
            Some(SubjectIdentifier::new(subject.to_string())),
        ) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "authority has no userinfo endpoint");
                return Ok(ClaimSet::new());
            }
        };

        let info: UserInfoClaims<ExtraClaims, CoreGenderClaim> = request
            .request_async(&self.http_client)
            .await
            .map_err(|e| RemoteAuthError::NetworkFailure(error_chain(&e)))?;

        let mut claims = ClaimSet::new().with(claim_types::SUBJECT, info.subject().to_string());
        if let Some(name) = info.name().and_then(|n| n.get(None)) {
            claims.push(claim_types::NAME, name.to_string());
        }
        if let Some(username) = info.preferred_username() {
            claims.push(claim_types::PREFERRED_USERNAME, username.to_string());
        }
        if let Some(email) = info.email() {
            claims.push(claim_types::EMAIL, email.to_string());
        }
        if let Some(verified) = info.email_verified() {
            claims.push(claim_types::EMAIL_VERIFIED, verified.to_string());
        }
        push_json_claims(
            &mut claims,
            info.additional_claims().claims.clone().into_iter().collect(),
        );
        Ok(claims)
    }
}

/// Decode the payload segment of a JWT whose signature was already checked.
fn jwt_payload(raw_jwt: &str) -> Map<String, Value> {
    raw_jwt
        .split('.')
        .nth(1)
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload).ok())
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Server-side rejections carry an OAuth error code; everything else is
/// treated as a transport failure.
fn token_error<RE>(
    err: RequestTokenError<RE, StandardErrorResponse<CoreErrorResponseType>>,
) -> RemoteAuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => RemoteAuthError::InvalidCode {
            error: serde_json::to_value(response.error())
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_else(|| "invalid_grant".to_string()),
            description: response.error_description().cloned(),
        },
        other => RemoteAuthError::NetworkFailure(error_chain(&other)),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
