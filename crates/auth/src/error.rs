use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the axum side of authentication.
///
/// Wraps the core `AuthError` and adds variants for I/O that can't live in
/// the functional core. Remote failures during the callback never surface
/// here; they become a login redirect instead.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Core(#[from] oidping_core::auth::AuthError),

    #[error(transparent)]
    Settings(#[from] oidping_core::auth::ConfigError),

    /// Discovery or client construction against the authority failed.
    #[error("OIDC provider error: {0}")]
    Provider(String),

    /// Challenge requested for a scheme that is not an OIDC challenge scheme.
    #[error("unknown login provider: {0}")]
    UnknownProvider(String),
}

impl AuthError {
    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Self::Core(oidping_core::auth::AuthError::Storage(err.to_string()))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use oidping_core::auth::AuthError as CoreError;

        let (status, message) = match &self {
            AuthError::Core(core_err) => match core_err {
                CoreError::SessionNotFound | CoreError::SessionExpired => {
                    (StatusCode::UNAUTHORIZED, self.to_string())
                }
                CoreError::AccountNotConfirmed => (StatusCode::FORBIDDEN, self.to_string()),
                CoreError::InvalidConfirmation => (StatusCode::BAD_REQUEST, self.to_string()),
                CoreError::Storage(_) => {
                    tracing::error!(error = %self, "auth storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AuthError::Provider(_) => {
                tracing::error!(error = %self, "OIDC provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "Authentication provider error".to_string(),
                )
            }
            AuthError::Settings(_) => {
                tracing::error!(error = %self, "auth configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AuthError::UnknownProvider(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidping_core::auth::{AuthError as CoreError, ConfigError};

    #[test]
    fn storage_errors_hide_details() {
        let response = AuthError::storage("disk full").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn expired_session_is_unauthorized() {
        let response = AuthError::Core(CoreError::SessionExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn settings_errors_keep_the_field_name() {
        let err = AuthError::from(ConfigError::MissingField(
            "OpenIdConnect:ClientId".to_string(),
        ));
        assert_eq!(err.to_string(), "OpenIdConnect:ClientId is required");
    }

    #[test]
    fn unknown_provider_is_bad_request() {
        let response = AuthError::UnknownProvider("github".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
