use thiserror::Error;

/// Startup configuration errors. Any of these stops the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent or empty. Holds the full key name,
    /// e.g. `OpenIdConnect:ClientId`.
    #[error("{0} is required")]
    MissingField(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown authentication scheme: {0}")]
    UnknownScheme(String),

    #[error("authentication scheme registered more than once: {0}")]
    DuplicateScheme(String),
}

/// Failures of the remote (federated) part of a login attempt.
///
/// Every variant is recoverable per request: the callback handler turns it
/// into a redirect to the login page and never lets it escape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteAuthError {
    /// The authority could not be reached or answered garbage.
    #[error("network failure talking to the authority: {0}")]
    NetworkFailure(String),

    /// The authority rejected the authorization code or returned an OAuth
    /// error other than `access_denied`.
    #[error("authority rejected the request ({error})")]
    InvalidCode {
        error: String,
        description: Option<String>,
    },

    /// The ID token failed validation (signature, audience, nonce, ...).
    #[error("invalid ID token: {0}")]
    InvalidToken(String),

    /// Unknown, expired, replayed or uncorrelated `state` parameter.
    #[error("state parameter did not match a pending login")]
    StateMismatch,

    /// The user or the authority refused consent.
    #[error("access denied by the authority")]
    ConsentDenied { description: Option<String> },

    /// The code exchange did not finish within the HTTP client timeout.
    #[error("timed out waiting for the authority")]
    Timeout,
}

impl RemoteAuthError {
    /// Human-readable message that may be shown to the user.
    ///
    /// Returns `None` when the cause carries nothing presentable; transport
    /// and token details stay in the logs.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::NetworkFailure(_) | Self::InvalidToken(_) | Self::Timeout => None,
            Self::InvalidCode { description, .. } => description.as_deref(),
            Self::StateMismatch => Some("Correlation failed."),
            Self::ConsentDenied { description } => description
                .as_deref()
                .or(Some("Access was denied by the identity provider.")),
        }
    }

    /// Short machine-readable label, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkFailure(_) => "network_failure",
            Self::InvalidCode { .. } => "invalid_code",
            Self::InvalidToken(_) => "invalid_token",
            Self::StateMismatch => "state_mismatch",
            Self::ConsentDenied { .. } => "consent_denied",
            Self::Timeout => "timeout",
        }
    }
}

/// Local sign-in and session errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account has not been confirmed")]
    AccountNotConfirmed,

    #[error("invalid or expired confirmation code")]
    InvalidConfirmation,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_key() {
        let err = ConfigError::MissingField("OpenIdConnect:Authority".to_string());
        assert_eq!(err.to_string(), "OpenIdConnect:Authority is required");
    }

    #[test]
    fn transport_failures_carry_no_user_message() {
        assert_eq!(
            RemoteAuthError::NetworkFailure("connection reset".to_string()).user_message(),
            None
        );
        assert_eq!(RemoteAuthError::Timeout.user_message(), None);
        assert_eq!(
            RemoteAuthError::InvalidToken("bad signature".to_string()).user_message(),
            None
        );
    }

    #[test]
    fn invalid_code_surfaces_the_authority_description() {
        let err = RemoteAuthError::InvalidCode {
            error: "invalid_grant".to_string(),
            description: Some("Authorization code expired".to_string()),
        };
        assert_eq!(err.user_message(), Some("Authorization code expired"));

        let bare = RemoteAuthError::InvalidCode {
            error: "invalid_grant".to_string(),
            description: None,
        };
        assert_eq!(bare.user_message(), None);
    }

    #[test]
    fn consent_denied_always_has_a_message() {
        let err = RemoteAuthError::ConsentDenied { description: None };
        assert!(err.user_message().is_some());

        let described = RemoteAuthError::ConsentDenied {
            description: Some("User cancelled".to_string()),
        };
        assert_eq!(described.user_message(), Some("User cancelled"));
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            RemoteAuthError::NetworkFailure(String::new()).kind(),
            RemoteAuthError::InvalidCode {
                error: String::new(),
                description: None,
            }
            .kind(),
            RemoteAuthError::InvalidToken(String::new()).kind(),
            RemoteAuthError::StateMismatch.kind(),
            RemoteAuthError::ConsentDenied { description: None }.kind(),
            RemoteAuthError::Timeout.kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
