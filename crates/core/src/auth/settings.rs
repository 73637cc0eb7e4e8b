//! OIDC settings and the configuration loader.
//!
//! Settings are read once at startup from a [`ConfigSource`] and then passed
//! around as an immutable value. Required keys fail fast; everything else has
//! a default matching the identity provider registration this service ships
//! with.

use std::collections::HashMap;

use url::Url;

use super::ConfigError;

/// Fixed callback path registered with the authority. Not configurable.
pub const CALLBACK_PATH: &str = "/signin-oidc";

/// Configuration namespace for all OIDC keys.
pub const SECTION: &str = "OpenIdConnect";

const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Read-only key/value configuration.
///
/// Keys use `:` as the section separator (`OpenIdConnect:ClientId`).
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory configuration source.
#[derive(Debug, Clone, Default)]
pub struct MapSource(HashMap<String, String>);

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Client secret wrapper that keeps the value out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientSecret([redacted])")
    }
}

/// Validated OIDC settings.
#[derive(Debug, Clone)]
pub struct OidcSettings {
    pub authority: Url,
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub response_type: String,
    pub save_tokens: bool,
    pub get_claims_from_user_info: bool,
    pub scopes: Vec<String>,
}

impl OidcSettings {
    /// The callback path. Always `/signin-oidc`.
    pub fn callback_path(&self) -> &'static str {
        CALLBACK_PATH
    }

    /// Scopes joined for the `scope` request parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Load OIDC settings from `source`.
///
/// Required keys are checked in order (`Authority`, `ClientId`,
/// `ClientSecret`) and the first one missing is reported.
///
/// # Errors
///
/// - `ConfigError::MissingField` for an absent or blank required key
/// - `ConfigError::InvalidValue` for an unparsable authority URL or boolean
pub fn load(source: &dyn ConfigSource) -> Result<OidcSettings, ConfigError> {
    let authority = required(source, "Authority")?;
    let client_id = required(source, "ClientId")?;
    let client_secret = required(source, "ClientSecret")?;

    let authority = Url::parse(&authority).map_err(|e| ConfigError::InvalidValue {
        field: key("Authority"),
        reason: e.to_string(),
    })?;

    let response_type = optional(source, "ResponseType")
        .unwrap_or_else(|| DEFAULT_RESPONSE_TYPE.to_string());

    Ok(OidcSettings {
        authority,
        client_id,
        client_secret: ClientSecret::new(client_secret),
        response_type,
        save_tokens: flag(source, "SaveTokens", true)?,
        get_claims_from_user_info: flag(source, "GetClaimsFromUserInfoEndpoint", true)?,
        scopes: parse_scopes(optional(source, "Scope").as_deref()),
    })
}

/// Split a space separated scope string.
///
/// Missing or blank input yields `openid profile email`, and so does any
/// input containing a token outside the RFC 6749 `scope-token` grammar.
pub fn parse_scopes(raw: Option<&str>) -> Vec<String> {
    let scopes: Vec<String> = raw
        .unwrap_or_default()
        .split_whitespace()
        .map(String::from)
        .collect();

    if scopes.is_empty() || !scopes.iter().all(|s| is_scope_token(s)) {
        DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
    } else {
        scopes
    }
}

/// `1*( %x21 / %x23-5B / %x5D-7E )`
fn is_scope_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E))
}

fn key(name: &str) -> String {
    format!("{SECTION}:{name}")
}

fn optional(source: &dyn ConfigSource, name: &str) -> Option<String> {
    source
        .get(&key(name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(source: &dyn ConfigSource, name: &str) -> Result<String, ConfigError> {
    optional(source, name).ok_or_else(|| ConfigError::MissingField(key(name)))
}

fn flag(source: &dyn ConfigSource, name: &str, default: bool) -> Result<bool, ConfigError> {
    match optional(source, name) {
        None => Ok(default),
        Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
        Some(value) => Err(ConfigError::InvalidValue {
            field: key(name),
            reason: format!("expected true or false, got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> MapSource {
        MapSource::new()
            .with("OpenIdConnect:Authority", "https://idp.example")
            .with("OpenIdConnect:ClientId", "abc")
            .with("OpenIdConnect:ClientSecret", "xyz")
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let settings = load(&minimal()).unwrap();

        assert_eq!(settings.authority.as_str(), "https://idp.example/");
        assert_eq!(settings.client_id, "abc");
        assert_eq!(settings.client_secret.expose(), "xyz");
        assert_eq!(settings.response_type, "code");
        assert!(settings.save_tokens);
        assert!(settings.get_claims_from_user_info);
        assert_eq!(settings.scopes, vec!["openid", "profile", "email"]);
        assert_eq!(settings.callback_path(), "/signin-oidc");
    }

    #[test]
    fn each_missing_required_field_is_named() {
        for field in ["Authority", "ClientId", "ClientSecret"] {
            let source: MapSource = [
                ("OpenIdConnect:Authority", "https://idp.example"),
                ("OpenIdConnect:ClientId", "abc"),
                ("OpenIdConnect:ClientSecret", "xyz"),
            ]
            .into_iter()
            .filter(|(k, _)| *k != format!("OpenIdConnect:{field}"))
            .collect();

            let err = load(&source).unwrap_err();
            assert_eq!(
                err,
                ConfigError::MissingField(format!("OpenIdConnect:{field}"))
            );
        }
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let source = minimal().with("OpenIdConnect:ClientSecret", "   ");
        assert_eq!(
            load(&source).unwrap_err(),
            ConfigError::MissingField("OpenIdConnect:ClientSecret".to_string())
        );
    }

    #[test]
    fn first_missing_field_wins() {
        let err = load(&MapSource::new()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField("OpenIdConnect:Authority".to_string())
        );
    }

    #[test]
    fn invalid_authority_is_rejected() {
        let source = minimal().with("OpenIdConnect:Authority", "not a url");
        assert!(matches!(
            load(&source),
            Err(ConfigError::InvalidValue { field, .. }) if field == "OpenIdConnect:Authority"
        ));
    }

    #[test]
    fn explicit_scopes_keep_their_order() {
        let source = minimal().with("OpenIdConnect:Scope", "openid  email offline_access");
        let settings = load(&source).unwrap();
        assert_eq!(settings.scopes, vec!["openid", "email", "offline_access"]);
        assert_eq!(settings.scope_param(), "openid email offline_access");
    }

    #[test]
    fn empty_or_blank_scope_falls_back_to_defaults() {
        for raw in [None, Some(""), Some("   "), Some("\t\n")] {
            assert_eq!(parse_scopes(raw), vec!["openid", "profile", "email"]);
        }
    }

    #[test]
    fn scope_with_invalid_characters_falls_back_to_defaults() {
        for raw in [
            "openid \"profile\" email",
            "openid em\\ail",
            "openid \u{7}",
            "openid profil\u{e9}",
        ] {
            assert_eq!(
                parse_scopes(Some(raw)),
                vec!["openid", "profile", "email"],
                "{raw:?}"
            );
        }
    }

    #[test]
    fn boolean_flags_parse_case_insensitively() {
        let source = minimal()
            .with("OpenIdConnect:SaveTokens", "False")
            .with("OpenIdConnect:GetClaimsFromUserInfoEndpoint", "FALSE");
        let settings = load(&source).unwrap();
        assert!(!settings.save_tokens);
        assert!(!settings.get_claims_from_user_info);
    }

    #[test]
    fn malformed_boolean_is_rejected() {
        let source = minimal().with("OpenIdConnect:SaveTokens", "yes");
        assert!(matches!(
            load(&source),
            Err(ConfigError::InvalidValue { field, .. }) if field == "OpenIdConnect:SaveTokens"
        ));
    }

    #[test]
    fn response_type_can_be_overridden() {
        let source = minimal().with("OpenIdConnect:ResponseType", "code id_token");
        assert_eq!(load(&source).unwrap().response_type, "code id_token");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let settings = load(&minimal()).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("xyz"));
    }
}
