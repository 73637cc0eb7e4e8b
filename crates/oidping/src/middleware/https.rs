//! HTTPS enforcement.
//!
//! TLS terminates upstream; `X-Forwarded-Proto: http` marks a plain request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::state::AppState;

/// 30 days.
pub const HSTS_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

fn host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|h| h.to_str().ok())
}

fn is_loopback(host: &str) -> bool {
    let name = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    matches!(name, "localhost" | "127.0.0.1" | "[::1]")
}

pub async fn enforce_https(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let plain = request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("http"));

    if plain {
        let authority = host(request.headers())
            .map(str::to_string)
            .or_else(|| state.auth.config.base_url.host_str().map(str::to_string));

        if let Some(authority) = authority {
            let path = request
                .uri()
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/");
            let location = format!("https://{authority}{path}");
            tracing::debug!(%location, "redirecting to HTTPS");
            return Redirect::permanent(&location).into_response();
        }
    }

    let send_hsts = !state.config.environment.is_development()
        && !host(request.headers()).is_some_and(is_loopback);

    let mut response = next.run(request).await;
    if send_hsts {
        if let Ok(value) = HeaderValue::from_str(&format!("max-age={HSTS_MAX_AGE_SECS}")) {
            response
                .headers_mut()
                .insert(header::STRICT_TRANSPORT_SECURITY, value);
        }
    }
    response
}
