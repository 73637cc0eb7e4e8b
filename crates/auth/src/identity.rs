//! Identity store adapter: turns a validated external login into a local
//! user and a local session.

use chrono::{Duration, Utc};
use oidping_core::auth::{
    calculate_expiry, email_to_name, generate_confirmation_code, generate_session_id,
    MappedPrincipal, Session, TokenSet,
};
use oidping_core::storage::{LocalUser, RepositoryError};
use url::Url;
use uuid::Uuid;

use crate::error::AuthError;
use crate::AuthState;

/// Path of the account confirmation endpoint.
pub const CONFIRM_EMAIL_PATH: &str = "/Account/ConfirmEmail";

/// Find the local user linked to `principal`, creating one on first login.
///
/// Existing users get their profile refreshed from the latest claims. New
/// users are confirmed only when the authority asserts `email_verified`;
/// otherwise a confirmation link goes out.
pub async fn find_or_create(
    state: &AuthState,
    provider: &str,
    principal: &MappedPrincipal,
) -> Result<LocalUser, AuthError> {
    if let Some(mut user) = state
        .users
        .get_user_by_login(provider, &principal.subject)
        .await
        .map_err(AuthError::storage)?
    {
        if refresh_profile(&mut user, principal) {
            state
                .users
                .update_user(&user)
                .await
                .map_err(AuthError::storage)?;
        }
        return Ok(user);
    }

    let email = principal.email.clone().unwrap_or_default();
    let name = principal
        .name
        .clone()
        .unwrap_or_else(|| email_to_name(&email));

    let user = LocalUser::new(name, email)
        .with_login(provider, &principal.subject)
        .with_roles(principal.roles.clone())
        .confirmed(principal.email_verified);

    match state.users.create_user(&user).await {
        Ok(()) => {}
        Err(RepositoryError::AlreadyExists { .. }) => {
            // Another callback for the same login inserted first.
            tracing::debug!(provider, subject = %principal.subject, "user created concurrently");
            return state
                .users
                .get_user_by_login(provider, &principal.subject)
                .await
                .map_err(AuthError::storage)?
                .ok_or_else(|| AuthError::storage("user for external login vanished after insert"));
        }
        Err(e) => return Err(AuthError::storage(e)),
    }

    tracing::info!(user_id = %user.id, confirmed = user.email_confirmed, "local user created");

    if !user.email_confirmed {
        send_confirmation(state, &user).await?;
    }

    Ok(user)
}

/// Copy name, email, roles and a positive `email_verified` onto `user`.
/// Returns whether anything changed.
fn refresh_profile(user: &mut LocalUser, principal: &MappedPrincipal) -> bool {
    let before = user.clone();

    if let Some(name) = &principal.name {
        user.name = name.clone();
    }
    if let Some(email) = &principal.email {
        user.email = email.clone();
    }
    user.roles = principal.roles.clone();
    if principal.email_verified {
        user.email_confirmed = true;
    }

    *user != before
}

/// Issue a fresh confirmation code and hand the link to the email sender.
pub async fn send_confirmation(state: &AuthState, user: &LocalUser) -> Result<(), AuthError> {
    let code = generate_confirmation_code();
    state
        .users
        .store_confirmation_code(user.id, &code)
        .await
        .map_err(AuthError::storage)?;

    let link = confirmation_link(&state.config.base_url, user.id, &code);
    state.email.send_confirmation_link(user, link.as_str()).await?;
    Ok(())
}

pub fn confirmation_link(base_url: &Url, user_id: Uuid, code: &str) -> Url {
    let mut link = base_url.clone();
    link.set_path(CONFIRM_EMAIL_PATH);
    link.query_pairs_mut()
        .clear()
        .append_pair("userId", &user_id.to_string())
        .append_pair("code", code);
    link
}

/// Issue a local session for `user` under the application scheme.
///
/// # Errors
///
/// `AccountNotConfirmed` when the sign-in policy refuses the user.
pub async fn begin_session(
    state: &AuthState,
    user: &LocalUser,
    tokens: Option<TokenSet>,
) -> Result<Session, AuthError> {
    state.policy.check(user)?;

    let now = Utc::now();
    let ttl = Duration::seconds(state.config.session_ttl.as_secs() as i64);
    let session = Session {
        id: generate_session_id(),
        user_id: user.id.to_string(),
        scheme: state.schemes.default_authenticate().name.clone(),
        created_at: now,
        expires_at: calculate_expiry(now, ttl),
        tokens,
    };
    state.sessions.create_session(&session).await?;

    Ok(session)
}
