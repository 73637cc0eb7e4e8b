use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};

use super::{AuthFlowState, Session, SessionId};

/// How long a pending login may wait for its callback.
pub const AUTH_FLOW_MAX_AGE_MINUTES: i64 = 15;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a cryptographically random session ID.
pub fn generate_session_id() -> SessionId {
    SessionId::new(random_alphanumeric(32))
}

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

/// Generate a nonce bound into the ID token.
pub fn generate_nonce() -> String {
    random_alphanumeric(32)
}

/// Generate an account confirmation code.
pub fn generate_confirmation_code() -> String {
    random_alphanumeric(48)
}

/// Check if a session has expired.
pub fn is_session_expired(session: &Session, now: DateTime<Utc>) -> bool {
    session.expires_at <= now
}

/// Check if a pending login is too old to complete.
pub fn is_flow_expired(flow: &AuthFlowState, now: DateTime<Utc>) -> bool {
    flow.created_at + Duration::minutes(AUTH_FLOW_MAX_AGE_MINUTES) <= now
}

/// Calculate session expiry from creation time and TTL.
pub fn calculate_expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    created_at + ttl
}

/// Extract username from email if no name provided.
pub fn email_to_name(email: &str) -> String {
    match email.split('@').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "User".to_string(),
    }
}
