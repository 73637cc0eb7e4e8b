//! Claims and the claim-type mapping applied to every validated login.

use serde::{Deserialize, Serialize};

/// Standard claim types this service reads directly.
pub mod claim_types {
    pub const SUBJECT: &str = "sub";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
    pub const EMAIL: &str = "email";
    pub const EMAIL_VERIFIED: &str = "email_verified";
    pub const PREFERRED_USERNAME: &str = "preferred_username";
}

/// Ordered multimap of claim type to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet(Vec<(String, String)>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.0.push((claim_type.into(), value.into()));
    }

    pub fn with(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(claim_type, value);
        self
    }

    pub fn first(&self, claim_type: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(t, _)| t == claim_type)
            .map(|(_, v)| v.as_str())
    }

    pub fn all(&self, claim_type: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(t, _)| t == claim_type)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, claim_type: &str) -> bool {
        self.0.iter().any(|(t, _)| t == claim_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge claims retrieved from the userinfo endpoint.
    ///
    /// For every claim type present in `user_info`, all existing values of
    /// that type are replaced. The subject is never replaced.
    pub fn merge_user_info(&mut self, user_info: ClaimSet) {
        let incoming: Vec<String> = user_info
            .0
            .iter()
            .map(|(t, _)| t.clone())
            .filter(|t| t != claim_types::SUBJECT)
            .collect();

        self.0.retain(|(t, _)| !incoming.contains(t));
        self.0.extend(
            user_info
                .0
                .into_iter()
                .filter(|(t, _)| t != claim_types::SUBJECT),
        );
    }
}

/// Which claim types populate the principal's name and roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimMapping {
    pub name_claim_type: String,
    pub role_claim_type: String,
}

impl Default for ClaimMapping {
    fn default() -> Self {
        Self {
            name_claim_type: claim_types::NAME.to_string(),
            role_claim_type: claim_types::ROLE.to_string(),
        }
    }
}

/// Principal after mapping, ready for the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedPrincipal {
    pub subject: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub claims: ClaimSet,
}

impl ClaimMapping {
    /// Apply the mapping. Returns `None` when there is no subject claim.
    pub fn apply(&self, claims: ClaimSet) -> Option<MappedPrincipal> {
        let subject = claims.first(claim_types::SUBJECT)?.to_string();

        let name = claims
            .first(&self.name_claim_type)
            .or_else(|| claims.first(claim_types::PREFERRED_USERNAME))
            .map(String::from);

        let mut roles: Vec<String> = Vec::new();
        for role in claims.all(&self.role_claim_type) {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }

        let email = claims.first(claim_types::EMAIL).map(String::from);
        let email_verified = claims
            .first(claim_types::EMAIL_VERIFIED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Some(MappedPrincipal {
            subject,
            name,
            roles,
            email,
            email_verified,
            claims,
        })
    }
}
