//! Mock IdP server.

use axum::{
    extract::Query,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use super::templates;
use crate::providers::MockGrant;

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    state: String,
    redirect_uri: String,
    nonce: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    name: Option<String>,
    #[serde(default)]
    roles: String,
    /// Checkbox; present only when ticked.
    email_verified: Option<String>,
    form_post: Option<String>,
    decision: String,
    state: String,
    nonce: String,
    redirect_uri: String,
}

/// Mock IdP that answers the authorization endpoint.
pub struct MockIdpServer {
    port: u16,
}

impl MockIdpServer {
    /// # Arguments
    /// * `port` - The port to listen on (typically 3001)
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Routes:
    /// - `GET /authorize` - Login page
    /// - `POST /authorize/submit` - Allow or deny, then back to the relying party
    pub fn router() -> Router {
        Router::new()
            .route("/authorize", get(authorize))
            .route("/authorize/submit", post(authorize_submit))
    }

    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        tracing::info!("Mock IdP listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, Self::router()).await
    }
}

async fn authorize(Query(params): Query<AuthorizeQuery>) -> Html<String> {
    Html(templates::login_page(
        &params.state,
        &params.nonce,
        &params.redirect_uri,
    ))
}

async fn authorize_submit(Form(form): Form<LoginForm>) -> Response {
    let mut fields: Vec<(&str, String)> = Vec::new();

    if form.decision == "deny" {
        fields.push(("error", "access_denied".to_string()));
        fields.push((
            "error_description",
            "The user denied the request.".to_string(),
        ));
    } else {
        let grant = MockGrant {
            sub: format!("mock-{}", form.email),
            email: form.email,
            name: form.name,
            roles: form
                .roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
            email_verified: form.email_verified.is_some(),
            nonce: form.nonce,
        };
        fields.push(("code", grant.encode()));
    }
    fields.push(("state", form.state));

    if form.form_post.is_some() {
        return Html(templates::form_post_page(&form.redirect_uri, &fields)).into_response();
    }

    let query: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    let callback_url = format!("{}?{}", form.redirect_uri, query.join("&"));
    Redirect::to(&callback_url).into_response()
}
