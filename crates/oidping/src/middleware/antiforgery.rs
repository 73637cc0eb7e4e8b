//! Double-submit anti-forgery tokens.
//!
//! Every response carries the token cookie; every state-mutating request must
//! echo its value in the `RequestVerificationToken` header or the
//! `__RequestVerificationToken` form field. The OIDC callback is exempt, it is
//! bound to the login by `state` and the correlation cookie.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use oidping_core::auth::CALLBACK_PATH;
use rand::{distr::Alphanumeric, Rng};

use crate::state::AppState;

pub const ANTIFORGERY_COOKIE: &str = ".oidping.Antiforgery";
pub const ANTIFORGERY_HEADER: &str = "RequestVerificationToken";
pub const ANTIFORGERY_FORM_FIELD: &str = "__RequestVerificationToken";

const MAX_FORM_BYTES: usize = 64 * 1024;

/// The token for the current request, for embedding in rendered forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiforgeryToken(pub String);

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn is_state_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_exempt(path: &str) -> bool {
    path == CALLBACK_PATH
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

fn reject(reason: &'static str) -> Response {
    tracing::warn!(reason, "anti-forgery validation failed");
    (StatusCode::BAD_REQUEST, "Invalid anti-forgery token").into_response()
}

/// Check the submitted token against the cookie. Form bodies are buffered and
/// handed back so the handler can still read them.
async fn verify(request: Request, expected: &str) -> Result<Request, &'static str> {
    if let Some(submitted) = request.headers().get(ANTIFORGERY_HEADER) {
        return if submitted.as_bytes() == expected.as_bytes() {
            Ok(request)
        } else {
            Err("header token does not match cookie")
        };
    }

    if !is_form(&request) {
        return Err("no token submitted");
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| "form body unreadable")?;

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(name, _)| name == ANTIFORGERY_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    match submitted {
        Some(token) if token == expected => Ok(Request::from_parts(parts, Body::from(bytes))),
        Some(_) => Err("form token does not match cookie"),
        None => Err("no token submitted"),
    }
}

pub async fn enforce_antiforgery(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(ANTIFORGERY_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let mut request = request;
    if is_state_mutating(request.method()) && !is_exempt(request.uri().path()) {
        let Some(expected) = existing.as_deref() else {
            return reject("no token cookie");
        };
        request = match verify(request, expected).await {
            Ok(request) => request,
            Err(reason) => return reject(reason),
        };
    }

    let token = existing.clone().unwrap_or_else(generate_token);
    request
        .extensions_mut()
        .insert(AntiforgeryToken(token.clone()));

    let response = next.run(request).await;
    if existing.is_some() {
        return response;
    }

    let cookie = Cookie::build((ANTIFORGERY_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.auth.config.cookie_secure)
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), response).into_response()
}
