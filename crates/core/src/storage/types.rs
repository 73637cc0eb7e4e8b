use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A local account linked to one external login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    /// Scheme name of the external provider, e.g. `oidc`.
    pub provider: String,
    /// The authority's `sub` for this user.
    pub provider_subject: String,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl LocalUser {
    /// Creates a new, unconfirmed user.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            roles: Vec::new(),
            provider: String::new(),
            provider_subject: String::new(),
            email_confirmed: false,
            created_at: Utc::now(),
        }
    }

    /// Links the user to an external login.
    pub fn with_login(mut self, provider: impl Into<String>, subject: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.provider_subject = subject.into();
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.email_confirmed = confirmed;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
