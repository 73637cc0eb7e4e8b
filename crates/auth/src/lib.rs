//! OpenID Connect login for oidping.
//!
//! This crate provides:
//! - The login gateway: challenge, callback correlation, code exchange
//!   and remote failure recovery
//! - User and session stores (in-memory, or SQLite with the `sqlite` feature)
//! - Axum routes and extractors for the identity endpoints
//! - A mock identity provider for local development (with `mock` feature)

mod config;
mod email;
mod error;
mod extractors;
mod gateway;
mod handlers;
mod identity;
mod providers;
mod sessions;
mod state;
mod users;

#[cfg(test)]
mod test_support;

pub use config::{AuthConfig, EnvSource};
pub use email::NoOpEmailSender;
pub use error::AuthError;
pub use extractors::{CurrentUser, OptionalUser, RequireUser};
pub use gateway::{CallbackOutcome, CallbackParams, Challenge, ExternalLogin, OidcGateway};
pub use handlers::{
    auth_routes, LOGOUT_EVERYWHERE_PATH, LOGOUT_PATH, ME_PATH, PERFORM_EXTERNAL_LOGIN_PATH,
};
pub use identity::{
    begin_session, confirmation_link, find_or_create, send_confirmation, CONFIRM_EMAIL_PATH,
};
#[cfg(feature = "mock")]
pub use providers::MockProvider;
pub use providers::OpenIdProvider;
pub use sessions::InMemorySessionStore;
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
pub use state::AuthState;
pub use users::InMemoryUserStore;
#[cfg(feature = "sqlite")]
pub use users::SqliteUserStore;

#[cfg(feature = "mock")]
pub mod mock_idp;
