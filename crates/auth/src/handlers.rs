//! HTTP handlers for auth routes.

use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use oidping_core::auth::{
    failure_redirect, RedirectTarget, SchemeRole, Session, SessionId,
    ACCOUNT_NOT_CONFIRMED_MESSAGE, AUTH_FLOW_MAX_AGE_MINUTES, CALLBACK_PATH, EXTERNAL_LOGIN_PATH,
    LOGIN_PATH,
};
use oidping_core::storage::LocalUser;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::extractors::{CurrentUser, RequireUser};
use crate::gateway::{CallbackOutcome, CallbackParams, ExternalLogin};
use crate::identity::{self, CONFIRM_EMAIL_PATH};
use crate::AuthState;

pub const PERFORM_EXTERNAL_LOGIN_PATH: &str = "/Account/PerformExternalLogin";
pub const LOGOUT_PATH: &str = "/Account/Logout";
pub const LOGOUT_EVERYWHERE_PATH: &str = "/Account/LogoutEverywhere";
pub const ME_PATH: &str = "/Account/Me";

/// Query parameters for the challenge endpoint.
#[derive(Deserialize, Default)]
pub struct LoginQuery {
    /// Local path to land on after a successful login.
    pub return_to: Option<String>,
}

/// Form posted by the login page's external provider buttons.
#[derive(Deserialize)]
pub struct ExternalLoginForm {
    pub provider: String,
    pub return_to: Option<String>,
}

#[derive(Deserialize)]
pub struct ConfirmEmailQuery {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub code: String,
}

/// Creates the auth router.
///
/// Routes:
/// - `GET /Account/ExternalLogin` - Challenge the default OIDC scheme
/// - `POST /Account/PerformExternalLogin` - Challenge a named scheme (form)
/// - `GET /signin-oidc` - Callback, query response mode
/// - `POST /signin-oidc` - Callback, form_post response mode
/// - `POST /Account/Logout` - End current session
/// - `POST /Account/LogoutEverywhere` - End all sessions for current user
/// - `GET /Account/ConfirmEmail` - Confirm an account from the emailed link
/// - `GET /Account/Me` - Current user as JSON
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route(EXTERNAL_LOGIN_PATH, get(external_login))
        .route(PERFORM_EXTERNAL_LOGIN_PATH, post(perform_external_login))
        .route(CALLBACK_PATH, get(callback_query).post(callback_form))
        .route(LOGOUT_PATH, post(logout))
        .route(LOGOUT_EVERYWHERE_PATH, post(logout_everywhere))
        .route(CONFIRM_EMAIL_PATH, get(confirm_email))
        .route(ME_PATH, get(me))
}

async fn external_login(
    State(state): State<AuthState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    initiate_login(&state, jar, query.return_to.as_deref()).await
}

async fn perform_external_login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<ExternalLoginForm>,
) -> Result<(CookieJar, Redirect), AuthError> {
    match state.schemes.get(&form.provider) {
        Some(scheme) if scheme.role == SchemeRole::OidcChallenge => {}
        _ => return Err(AuthError::UnknownProvider(form.provider)),
    }
    initiate_login(&state, jar, form.return_to.as_deref()).await
}

async fn initiate_login(
    state: &AuthState,
    jar: CookieJar,
    return_to: Option<&str>,
) -> Result<(CookieJar, Redirect), AuthError> {
    let challenge = state.gateway.challenge(return_to);
    state
        .sessions
        .store_auth_flow(&challenge.state, &challenge.flow)
        .await?;

    // Form-post callbacks are cross-site POSTs, which only carry SameSite=None cookies
    let same_site = if state.config.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    };
    let correlation = Cookie::build((state.correlation_cookie_name(), challenge.state))
        .path(CALLBACK_PATH)
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(same_site)
        .max_age(time::Duration::minutes(AUTH_FLOW_MAX_AGE_MINUTES))
        .build();

    tracing::debug!(authority = %state.gateway.settings().authority, "challenging OIDC scheme");
    Ok((jar.add(correlation), Redirect::to(challenge.url.as_str())))
}

async fn callback_query(
    State(state): State<AuthState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    complete_login(&state, jar, params).await
}

async fn callback_form(
    State(state): State<AuthState>,
    jar: CookieJar,
    form: Result<Form<CallbackParams>, FormRejection>,
) -> (CookieJar, Redirect) {
    let params = match form {
        Ok(Form(params)) => params,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "unreadable callback form");
            CallbackParams::default()
        }
    };
    complete_login(&state, jar, params).await
}

/// Finish the login. Always answers with a redirect.
async fn complete_login(
    state: &AuthState,
    jar: CookieJar,
    params: CallbackParams,
) -> (CookieJar, Redirect) {
    let correlation_name = state.correlation_cookie_name();
    let correlation = jar.get(&correlation_name).map(|c| c.value().to_string());

    // The pending login is only consumed by the browser that started it.
    let (jar, flow) = match (params.state.as_deref(), correlation.as_deref()) {
        (Some(csrf_state), Some(expected)) if csrf_state == expected => {
            let flow = state
                .sessions
                .take_auth_flow(csrf_state)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "pending login lookup failed");
                    None
                });
            (jar.remove(Cookie::build(correlation_name).path(CALLBACK_PATH)), flow)
        }
        _ => {
            tracing::warn!("callback state does not match the correlation cookie");
            (jar, None)
        }
    };

    match state
        .gateway
        .authenticate(params, flow, correlation.as_deref())
        .await
    {
        CallbackOutcome::Succeeded(login) => sign_in(state, jar, login).await,
        CallbackOutcome::Failed { redirect, .. } => (jar, Redirect::to(redirect.location())),
    }
}

async fn sign_in(state: &AuthState, jar: CookieJar, login: ExternalLogin) -> (CookieJar, Redirect) {
    let provider = state.schemes.default_challenge().name.clone();

    let user = match identity::find_or_create(state, &provider, &login.principal).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "could not store external login");
            return (jar, Redirect::to(failure_redirect(None).location()));
        }
    };

    let session = match identity::begin_session(state, &user, login.tokens).await {
        Ok(session) => session,
        Err(AuthError::Core(oidping_core::auth::AuthError::AccountNotConfirmed)) => {
            tracing::info!(user_id = %user.id, "sign-in refused, account not confirmed");
            let target = RedirectTarget::login_with_error(ACCOUNT_NOT_CONFIRMED_MESSAGE);
            return (jar, Redirect::to(target.location()));
        }
        Err(e) => {
            tracing::error!(error = %e, "could not create session");
            return (jar, Redirect::to(failure_redirect(None).location()));
        }
    };

    tracing::info!(user_id = %user.id, "signed in");

    let jar = jar.add(session_cookie(state, &session));
    let redirect_url = login.return_to.unwrap_or_else(|| "/".to_string());
    (jar, Redirect::to(&redirect_url))
}

fn session_cookie(state: &AuthState, session: &Session) -> Cookie<'static> {
    Cookie::build((state.session_cookie_name(), session.id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            state.config.session_ttl.as_secs() as i64
        ))
        .build()
}

fn clear_session_cookie(state: &AuthState, jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(state.session_cookie_name()).path("/"))
}

async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    if let Some(cookie) = jar.get(&state.session_cookie_name()) {
        let session_id = SessionId::new(cookie.value().to_string());
        state.sessions.delete_session(&session_id).await?;
    }

    Ok((clear_session_cookie(&state, jar), Redirect::to("/")))
}

async fn logout_everywhere(
    State(state): State<AuthState>,
    RequireUser { user, .. }: RequireUser,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    state
        .sessions
        .delete_user_sessions(&user.id.to_string())
        .await?;

    Ok((clear_session_cookie(&state, jar), Redirect::to("/")))
}

async fn confirm_email(
    State(state): State<AuthState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<Redirect, AuthError> {
    let confirmed = state
        .users
        .confirm_account(query.user_id, &query.code)
        .await
        .map_err(AuthError::storage)?;

    if !confirmed {
        return Err(oidping_core::auth::AuthError::InvalidConfirmation.into());
    }

    tracing::info!(user_id = %query.user_id, "account confirmed");
    Ok(Redirect::to(&format!("{LOGIN_PATH}?confirmed=true")))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<LocalUser> {
    Json(user)
}
