//! Authentication scheme registry.
//!
//! The registry is built once at startup and is immutable afterwards. It
//! decides which scheme a successful external login signs into and where an
//! unauthenticated request is sent.

use serde::Serialize;

use super::ConfigError;

/// Scheme name of the local application session cookie.
pub const APPLICATION_SCHEME: &str = "Identity.Application";
/// Scheme name of the short-lived external sign-in cookie.
pub const EXTERNAL_SCHEME: &str = "Identity.External";
/// Scheme name of the OIDC challenge handler.
pub const OIDC_SCHEME: &str = "oidc";

/// Login page the application-session scheme challenges to.
pub const LOGIN_PATH: &str = "/Account/Login";
/// Endpoint that starts an OIDC challenge.
pub const EXTERNAL_LOGIN_PATH: &str = "/Account/ExternalLogin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeRole {
    ApplicationSession,
    ExternalSignIn,
    OidcChallenge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticationScheme {
    pub name: String,
    pub role: SchemeRole,
}

impl AuthenticationScheme {
    pub fn new(name: impl Into<String>, role: SchemeRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    schemes: Vec<AuthenticationScheme>,
    default_sign_in: usize,
    default_challenge: usize,
}

impl SchemeRegistry {
    /// Register `schemes` and pick the defaults by name.
    ///
    /// # Errors
    ///
    /// - `ConfigError::DuplicateScheme` if two schemes share a name
    /// - `ConfigError::UnknownScheme` if a default does not name a registered scheme
    pub fn register(
        schemes: Vec<AuthenticationScheme>,
        default_sign_in: &str,
        default_challenge: &str,
    ) -> Result<Self, ConfigError> {
        for (i, scheme) in schemes.iter().enumerate() {
            if schemes[..i].iter().any(|s| s.name == scheme.name) {
                return Err(ConfigError::DuplicateScheme(scheme.name.clone()));
            }
        }

        let position = |name: &str| {
            schemes
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| ConfigError::UnknownScheme(name.to_string()))
        };

        let default_sign_in = position(default_sign_in)?;
        let default_challenge = position(default_challenge)?;

        Ok(Self {
            schemes,
            default_sign_in,
            default_challenge,
        })
    }

    /// Cookie session, external sign-in and OIDC challenge, with external
    /// sign-in as the sign-in default and OIDC as the challenge default.
    pub fn standard() -> Self {
        Self {
            schemes: vec![
                AuthenticationScheme::new(APPLICATION_SCHEME, SchemeRole::ApplicationSession),
                AuthenticationScheme::new(EXTERNAL_SCHEME, SchemeRole::ExternalSignIn),
                AuthenticationScheme::new(OIDC_SCHEME, SchemeRole::OidcChallenge),
            ],
            default_sign_in: 1,
            default_challenge: 2,
        }
    }

    pub fn get(&self, name: &str) -> Option<&AuthenticationScheme> {
        self.schemes.iter().find(|s| s.name == name)
    }

    pub fn schemes(&self) -> &[AuthenticationScheme] {
        &self.schemes
    }

    pub fn default_sign_in(&self) -> &AuthenticationScheme {
        &self.schemes[self.default_sign_in]
    }

    pub fn default_challenge(&self) -> &AuthenticationScheme {
        &self.schemes[self.default_challenge]
    }

    /// The scheme local sessions are issued under: the first application
    /// session scheme, or the sign-in default when none is registered.
    pub fn default_authenticate(&self) -> &AuthenticationScheme {
        self.schemes
            .iter()
            .find(|s| s.role == SchemeRole::ApplicationSession)
            .unwrap_or_else(|| self.default_sign_in())
    }

    /// Where an unauthenticated request for `return_to` is sent.
    pub fn challenge_location(&self, return_to: Option<&str>) -> String {
        let path = match self.default_challenge().role {
            SchemeRole::OidcChallenge => EXTERNAL_LOGIN_PATH,
            SchemeRole::ApplicationSession | SchemeRole::ExternalSignIn => LOGIN_PATH,
        };

        match return_to {
            Some(target) => format!("{path}?return_to={}", urlencoding::encode(target)),
            None => path.to_string(),
        }
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
