//! Error boundary.
//!
//! Server errors never reach the user agent as raw text: production gets the
//! generic error page, development gets a diagnostics page built from the
//! `ErrorDetail` the failing handler (or the panic hook) left on the response.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};

use crate::handlers::pages;
use crate::state::AppState;

/// What went wrong, attached to 5xx responses as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    /// Underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}

/// Response for a handler that panicked.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %message, "handler panicked");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response
        .extensions_mut()
        .insert(ErrorDetail::new(format!("handler panicked: {message}")));
    response
}

pub async fn error_boundary(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_server_error() {
        return response;
    }

    let detail = response.extensions().get::<ErrorDetail>().cloned();
    tracing::debug!(%method, %path, status = status.as_u16(), "rendering error page");

    let page = if state.config.environment.is_development() {
        pages::diagnostics_html(status, method.as_str(), &path, detail.as_ref())
    } else {
        pages::error_html()
    };

    (status, Html(page)).into_response()
}
