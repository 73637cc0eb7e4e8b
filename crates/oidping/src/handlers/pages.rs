//! Server-rendered pages.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use oidping_auth::{
    OptionalUser, RequireUser, LOGOUT_EVERYWHERE_PATH, LOGOUT_PATH, PERFORM_EXTERNAL_LOGIN_PATH,
};
use oidping_core::auth::{validate_return_to, SchemeRole, EXTERNAL_LOGIN_PATH, LOGIN_PATH};
use serde::Deserialize;

use crate::middleware::{AntiforgeryToken, ErrorDetail, ANTIFORGERY_FORM_FIELD};
use crate::state::AppState;

pub const MANAGE_PATH: &str = "/Account/Manage";
pub const ERROR_PATH: &str = "/Error";

const CONFIRMED_MESSAGE: &str = "Thank you for confirming your email. You can sign in now.";
const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

#[derive(Deserialize, Default)]
pub struct LoginQuery {
    /// Message from a failed login.
    pub error: Option<String>,
    /// Set after an account confirmation link was followed.
    #[serde(default)]
    pub confirmed: bool,
    pub return_to: Option<String>,
}

/// Renders an askama page into an HTML response.
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "page failed to render");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE).into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage<'a> {
    user_name: Option<&'a str>,
    token: &'a str,
    token_field: &'a str,
    manage_path: &'a str,
    login_path: &'a str,
    logout_path: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage<'a> {
    error: Option<&'a str>,
    confirmed: bool,
    confirmed_message: &'a str,
    return_to: Option<&'a str>,
    schemes: Vec<&'a str>,
    token: &'a str,
    token_field: &'a str,
    perform_path: &'a str,
    external_login_path: &'a str,
}

#[derive(Template)]
#[template(path = "manage.html")]
struct ManagePage<'a> {
    name: &'a str,
    email: &'a str,
    roles: String,
    provider: &'a str,
    expires: String,
    tokens: String,
    token: &'a str,
    token_field: &'a str,
    logout_path: &'a str,
    logout_everywhere_path: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    message: &'a str,
}

#[derive(Template)]
#[template(path = "diagnostics.html")]
struct DiagnosticsPage<'a> {
    status: String,
    method: &'a str,
    path: &'a str,
    detail: Option<&'a ErrorDetail>,
}

/// Error pages are rendered inside the error boundary and cannot fail.
fn render_error_page<T: Template>(page: &T) -> String {
    page.render().unwrap_or_else(|err| {
        tracing::error!(error = %err, "error page failed to render");
        GENERIC_ERROR_MESSAGE.to_string()
    })
}

/// GET /
pub async fn home(
    OptionalUser(user): OptionalUser,
    Extension(token): Extension<AntiforgeryToken>,
) -> impl IntoResponse {
    HtmlTemplate(HomePage {
        user_name: user.as_ref().map(|u| u.name.as_str()),
        token: &token.0,
        token_field: ANTIFORGERY_FORM_FIELD,
        manage_path: MANAGE_PATH,
        login_path: LOGIN_PATH,
        logout_path: LOGOUT_PATH,
    })
    .into_response()
}

/// GET /Account/Login
///
/// Shows the failure message of a previous attempt, if any, and one button
/// per external OIDC scheme.
pub async fn login(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Extension(token): Extension<AntiforgeryToken>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let return_to = query.return_to.as_deref().and_then(validate_return_to);

    if user.is_some() {
        return Redirect::to(return_to.unwrap_or("/")).into_response();
    }

    let schemes = state
        .auth
        .schemes
        .schemes()
        .iter()
        .filter(|scheme| scheme.role == SchemeRole::OidcChallenge)
        .map(|scheme| scheme.name.as_str())
        .collect();

    HtmlTemplate(LoginPage {
        error: query.error.as_deref().filter(|e| !e.trim().is_empty()),
        confirmed: query.confirmed,
        confirmed_message: CONFIRMED_MESSAGE,
        return_to,
        schemes,
        token: &token.0,
        token_field: ANTIFORGERY_FORM_FIELD,
        perform_path: PERFORM_EXTERNAL_LOGIN_PATH,
        external_login_path: EXTERNAL_LOGIN_PATH,
    })
    .into_response()
}

/// GET /Account/Manage
pub async fn manage(
    RequireUser { user, session }: RequireUser,
    Extension(token): Extension<AntiforgeryToken>,
) -> impl IntoResponse {
    let roles = if user.roles.is_empty() {
        "none".to_string()
    } else {
        user.roles.join(", ")
    };

    let tokens = match &session.tokens {
        Some(tokens) => match tokens.expires_at {
            Some(expires_at) => format!("saved, access token expires {}", expires_at.to_rfc3339()),
            None => "saved".to_string(),
        },
        None => "not saved".to_string(),
    };

    HtmlTemplate(ManagePage {
        name: &user.name,
        email: &user.email,
        roles,
        provider: &user.provider,
        expires: session.expires_at.to_rfc3339(),
        tokens,
        token: &token.0,
        token_field: ANTIFORGERY_FORM_FIELD,
        logout_path: LOGOUT_PATH,
        logout_everywhere_path: LOGOUT_EVERYWHERE_PATH,
    })
    .into_response()
}

/// GET /Error
pub async fn error_page() -> Html<String> {
    Html(error_html())
}

/// Generic error page shown outside development.
pub fn error_html() -> String {
    render_error_page(&ErrorPage {
        message: GENERIC_ERROR_MESSAGE,
    })
}

/// Detailed error page for development.
pub fn diagnostics_html(
    status: StatusCode,
    method: &str,
    path: &str,
    detail: Option<&ErrorDetail>,
) -> String {
    render_error_page(&DiagnosticsPage {
        status: status.to_string(),
        method,
        path,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_list_causes() {
        let detail = ErrorDetail {
            message: "loading user".to_string(),
            causes: vec!["disk <gone>".to_string()],
        };
        let html = diagnostics_html(
            StatusCode::INTERNAL_SERVER_ERROR,
            "GET",
            "/Account/Manage",
            Some(&detail),
        );

        assert!(html.contains("loading user"));
        assert!(html.contains("disk &lt;gone&gt;"));
        assert!(html.contains("GET /Account/Manage"));
        assert!(html.contains("<title>Error - oidping</title>"));
    }

    #[test]
    fn error_page_hides_details() {
        let html = error_html();
        assert!(html.contains(GENERIC_ERROR_MESSAGE));
        assert!(!html.contains("Caused by"));
    }

    #[test]
    fn login_page_escapes_failure_message_and_return_to() {
        let html = LoginPage {
            error: Some(r#"<script>alert("x")</script>"#),
            confirmed: false,
            confirmed_message: CONFIRMED_MESSAGE,
            return_to: Some(r#"/Account/Manage?q="x""#),
            schemes: vec!["oidc"],
            token: "token-1",
            token_field: ANTIFORGERY_FORM_FIELD,
            perform_path: PERFORM_EXTERNAL_LOGIN_PATH,
            external_login_path: EXTERNAL_LOGIN_PATH,
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains(r#"q="x""#));
        assert!(!html.contains(CONFIRMED_MESSAGE));
        assert!(html.contains(r#"value="token-1""#));
    }
}
