//! Remote failure recovery.
//!
//! Turning a failed login into a redirect is a pure function so it can be
//! checked without an HTTP stack.

use serde::Serialize;

use super::{RemoteAuthError, LOGIN_PATH};

/// Message used when the failure cause has nothing presentable.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Authentication failed";

/// Message shown when sign-in is refused for an unconfirmed account.
pub const ACCOUNT_NOT_CONFIRMED_MESSAGE: &str =
    "You must confirm your account before you can sign in.";

/// A failed remote authentication attempt, consumed by the redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEvent {
    pub message: String,
}

impl FailureEvent {
    pub fn from_cause(cause: Option<&RemoteAuthError>) -> Self {
        let message = cause
            .and_then(RemoteAuthError::user_message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);

        Self {
            message: message.to_string(),
        }
    }
}

/// Application-owned location a failed login lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    /// `/Account/Login?error=<url-encoded message>`.
    pub fn login_with_error(message: &str) -> Self {
        Self(format!(
            "{LOGIN_PATH}?error={}",
            urlencoding::encode(message)
        ))
    }

    pub fn location(&self) -> &str {
        &self.0
    }
}

impl From<FailureEvent> for RedirectTarget {
    fn from(event: FailureEvent) -> Self {
        Self::login_with_error(&event.message)
    }
}

/// Map a failure cause to the login page redirect.
pub fn failure_redirect(cause: Option<&RemoteAuthError>) -> RedirectTarget {
    FailureEvent::from_cause(cause).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded_error(target: &RedirectTarget) -> String {
        let encoded = target
            .location()
            .strip_prefix("/Account/Login?error=")
            .unwrap();
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    #[test]
    fn network_failure_uses_the_generic_message() {
        let target = failure_redirect(Some(&RemoteAuthError::NetworkFailure(
            "connection refused".to_string(),
        )));
        assert_eq!(
            target.location(),
            "/Account/Login?error=Authentication%20failed"
        );
    }

    #[test]
    fn missing_cause_uses_the_generic_message() {
        assert_eq!(
            failure_redirect(None).location(),
            "/Account/Login?error=Authentication%20failed"
        );
    }

    #[test]
    fn every_cause_redirects_to_the_login_page_and_round_trips() {
        let causes = [
            RemoteAuthError::NetworkFailure("dns".to_string()),
            RemoteAuthError::InvalidCode {
                error: "invalid_grant".to_string(),
                description: Some("Code expired & reused? 100%".to_string()),
            },
            RemoteAuthError::InvalidToken("aud".to_string()),
            RemoteAuthError::StateMismatch,
            RemoteAuthError::ConsentDenied {
                description: Some("Nein / non / いいえ".to_string()),
            },
            RemoteAuthError::Timeout,
        ];

        for cause in &causes {
            let target = failure_redirect(Some(cause));
            assert!(target.location().starts_with("/Account/Login?error="));

            let expected = cause.user_message().unwrap_or(DEFAULT_FAILURE_MESSAGE);
            assert_eq!(decoded_error(&target), expected);
        }
    }

    #[test]
    fn encoding_leaves_no_raw_separators() {
        let target = RedirectTarget::login_with_error("a&b=c #d");
        let query = target.location().split_once('?').unwrap().1;
        assert_eq!(query.matches('&').count(), 0);
        assert_eq!(query.matches('=').count(), 1);
        assert!(!query.contains(' '));
        assert!(!query.contains('#'));
    }

    #[test]
    fn blank_description_falls_back() {
        let cause = RemoteAuthError::InvalidCode {
            error: "server_error".to_string(),
            description: Some("  ".to_string()),
        };
        assert_eq!(
            FailureEvent::from_cause(Some(&cause)).message,
            DEFAULT_FAILURE_MESSAGE
        );
    }
}
