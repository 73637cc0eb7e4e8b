use std::sync::Arc;

use oidping_auth::AuthState;

use crate::config::Config;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: AuthState, config: Config) -> Self {
        Self {
            auth,
            config: Arc::new(config),
        }
    }
}

/// Lets the auth extractors and routes pull their state out of `AppState`.
impl AsRef<AuthState> for AppState {
    fn as_ref(&self) -> &AuthState {
        &self.auth
    }
}
