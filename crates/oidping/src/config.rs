use std::{fmt, path::PathBuf, str::FromStr};

use oidping_core::auth::ConfigError;

/// Key of the identity store connection string.
pub const DEFAULT_CONNECTION: &str = "ConnectionStrings:DefaultConnection";

/// Hosting environment. Decides how server errors are rendered and whether
/// HSTS is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "APP_ENVIRONMENT".to_string(),
                reason: format!("expected Development or Production, got {s:?}"),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("Development"),
            Self::Production => f.write_str("Production"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// SQLite connection string for users and sessions.
    pub default_connection: String,
    /// Directory served under `/static` (default: "wwwroot")
    pub static_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ConnectionStrings__DefaultConnection` - Identity store (required)
    /// - `APP_ENVIRONMENT` - `Development` or `Production` (default: Production)
    /// - `STATIC_DIR` - Static asset directory (default: "wwwroot")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default_connection = lookup(&DEFAULT_CONNECTION.replace(':', "__"))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(DEFAULT_CONNECTION.to_string()))?;

        let environment = match lookup("APP_ENVIRONMENT") {
            Some(raw) => raw.parse()?,
            None => Environment::default(),
        };

        Ok(Self {
            environment,
            default_connection,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("wwwroot")),
        })
    }

    /// Development configuration over an in-memory database.
    #[cfg(test)]
    pub fn for_tests(environment: Environment) -> Self {
        Self {
            environment,
            default_connection: "sqlite::memory:".to_string(),
            static_dir: PathBuf::from("wwwroot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn missing_connection_string_is_fatal() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField("ConnectionStrings:DefaultConnection".to_string())
        );
    }

    #[test]
    fn blank_connection_string_is_missing() {
        let err = Config::from_lookup(lookup(&[(
            "ConnectionStrings__DefaultConnection",
            "  ",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn defaults_to_production() {
        let config = Config::from_lookup(lookup(&[(
            "ConnectionStrings__DefaultConnection",
            "sqlite://oidping.db",
        )]))
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.default_connection, "sqlite://oidping.db");
        assert_eq!(config.static_dir, PathBuf::from("wwwroot"));
    }

    #[test]
    fn environment_is_case_insensitive() {
        let config = Config::from_lookup(lookup(&[
            ("ConnectionStrings__DefaultConnection", "sqlite::memory:"),
            ("APP_ENVIRONMENT", "development"),
        ]))
        .unwrap();
        assert!(config.environment.is_development());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ConnectionStrings__DefaultConnection", "sqlite::memory:"),
            ("APP_ENVIRONMENT", "Staging"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
