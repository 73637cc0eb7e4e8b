//! Axum extractors for authentication.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use oidping_core::auth::{is_session_expired, Session, SessionId};
use oidping_core::storage::LocalUser;

use crate::AuthState;

/// Why a request has no usable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anonymous {
    NoCookie,
    NotFound,
    Expired,
    LookupFailed,
}

impl Anonymous {
    fn rejection(self) -> (StatusCode, &'static str) {
        match self {
            Anonymous::NoCookie => (StatusCode::UNAUTHORIZED, "No session cookie"),
            Anonymous::NotFound => (StatusCode::UNAUTHORIZED, "Session not found"),
            Anonymous::Expired => (StatusCode::UNAUTHORIZED, "Session expired"),
            Anonymous::LookupFailed => (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed"),
        }
    }
}

/// Resolve the session cookie to a live session and its user.
async fn authenticate(
    auth_state: &AuthState,
    parts: &Parts,
) -> Result<(Session, LocalUser), Anonymous> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar
        .get(&auth_state.session_cookie_name())
        .ok_or(Anonymous::NoCookie)?;
    let session_id = SessionId::new(cookie.value().to_string());

    let session = auth_state
        .sessions
        .get_session(&session_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session lookup failed");
            Anonymous::LookupFailed
        })?
        .ok_or(Anonymous::NotFound)?;

    if is_session_expired(&session, Utc::now()) {
        return Err(Anonymous::Expired);
    }

    let user_id: uuid::Uuid = session.user_id.parse().map_err(|_| Anonymous::NotFound)?;

    let user = auth_state
        .users
        .get_user(user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            Anonymous::LookupFailed
        })?
        .ok_or(Anonymous::NotFound)?;

    Ok((session, user))
}

/// Extractor for an authenticated user. Returns 401 if not authenticated.
pub struct CurrentUser(pub LocalUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        authenticate(&auth_state, parts)
            .await
            .map(|(_, user)| CurrentUser(user))
            .map_err(Anonymous::rejection)
    }
}

/// Extractor for an optionally authenticated user. Never rejects.
pub struct OptionalUser(pub Option<LocalUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        Ok(OptionalUser(authenticate(&auth_state, parts).await.ok().map(|(_, user)| user)))
    }
}

/// Extractor for pages that need a signed-in user.
///
/// Anonymous requests are redirected to the default challenge with the
/// requested path as `return_to`.
pub struct RequireUser {
    pub user: LocalUser,
    pub session: Session,
}

impl<S> FromRequestParts<S> for RequireUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        match authenticate(&auth_state, parts).await {
            Ok((session, user)) => Ok(RequireUser { user, session }),
            Err(Anonymous::LookupFailed) => Err(Anonymous::LookupFailed.rejection().into_response()),
            Err(_) => {
                let return_to = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let location = auth_state.schemes.challenge_location(Some(return_to));
                Err(Redirect::to(&location).into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::begin_session;
    use crate::test_support::recording_state;
    use axum::{body::Body, http::header, routing::get, Router};
    use tower::ServiceExt;

    async fn whoami(CurrentUser(user): CurrentUser) -> String {
        user.name
    }

    async fn maybe(OptionalUser(user): OptionalUser) -> String {
        user.map(|u| u.name).unwrap_or_else(|| "anonymous".to_string())
    }

    async fn manage(RequireUser { user, .. }: RequireUser) -> String {
        user.name
    }

    async fn signed_in_cookie(state: &AuthState) -> String {
        let user = LocalUser::new("Ada", "ada@example.com").confirmed(true);
        state.users.create_user(&user).await.unwrap();
        let session = begin_session(state, &user, None).await.unwrap();
        format!("{}={}", state.session_cookie_name(), session.id)
    }

    fn app(state: AuthState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/maybe", get(maybe))
            .route("/Account/Manage", get(manage))
            .with_state(state)
    }

    fn request(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn current_user_rejects_anonymous() {
        let (state, _) = recording_state();
        let response = app(state).oneshot(request("/whoami", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn current_user_accepts_session_cookie() {
        let (state, _) = recording_state();
        let cookie = signed_in_cookie(&state).await;
        let response = app(state)
            .oneshot(request("/whoami", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn optional_user_tolerates_bogus_cookie() {
        let (state, _) = recording_state();
        let cookie = format!("{}=bogus", state.session_cookie_name());
        let response = app(state)
            .oneshot(request("/maybe", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn require_user_redirects_to_challenge() {
        let (state, _) = recording_state();
        let response = app(state)
            .oneshot(request("/Account/Manage", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/Account/ExternalLogin?return_to=%2FAccount%2FManage"
        );
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let (state, _) = recording_state();
        let user = LocalUser::new("Ada", "ada@example.com").confirmed(true);
        state.users.create_user(&user).await.unwrap();
        let mut session = begin_session(&state, &user, None).await.unwrap();
        session.id = SessionId::new("expired".to_string());
        session.expires_at = Utc::now() - chrono::Duration::minutes(1);
        state.sessions.create_session(&session).await.unwrap();

        let cookie = format!("{}=expired", state.session_cookie_name());
        let response = app(state)
            .oneshot(request("/whoami", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
