use std::env;

use chrono::Duration;
use config::builder::ConfigBuilder;
use config::builder::DefaultState;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::account::tokens::TokenLifetimes;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub tokens: TokensConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string. Without one the service keeps its data in memory.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    pub refresh_token_ttl_days: i64,
    pub email_verification_ttl_hours: i64,
    pub password_reset_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Base URL used to build the links sent to users
    pub app_base_url: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    /// 4. Built-in defaults for everything except `jwt.secret`
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = TokenLifetimes::default();

        config::Config::builder()
            .set_default("server.http_port", 3000_i64)?
            .set_default("database.max_connections", 5_i64)?
            .set_default(
                "jwt.access_token_ttl_minutes",
                defaults.access_token.num_minutes(),
            )?
            .set_default(
                "tokens.refresh_token_ttl_days",
                defaults.refresh_token.num_days(),
            )?
            .set_default(
                "tokens.email_verification_ttl_hours",
                defaults.email_verification.num_hours(),
            )?
            .set_default(
                "tokens.password_reset_ttl_hours",
                defaults.password_reset.num_hours(),
            )?
            .set_default("mail.app_base_url", "http://localhost:3000")
    }

    /// Token validity periods derived from the configured TTLs.
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access_token: Duration::minutes(self.jwt.access_token_ttl_minutes),
            refresh_token: Duration::days(self.tokens.refresh_token_ttl_days),
            email_verification: Duration::hours(self.tokens.email_verification_ttl_hours),
            password_reset: Duration::hours(self.tokens.password_reset_ttl_hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Result<Config, ConfigError> {
        Config::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = from_toml(
            r#"
            [jwt]
            secret = "test-secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.http_port, 3000);
        assert!(config.database.url.is_none());
        assert_eq!(config.lifetimes(), TokenLifetimes::default());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/identity"

            [jwt]
            secret = "test-secret"
            access_token_ttl_minutes = 5

            [tokens]
            password_reset_ttl_hours = 2
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/identity")
        );

        let lifetimes = config.lifetimes();
        assert_eq!(lifetimes.access_token, Duration::minutes(5));
        assert_eq!(lifetimes.password_reset, Duration::hours(2));
        assert_eq!(lifetimes.refresh_token, Duration::days(7));
    }

    #[test]
    fn test_secret_is_required() {
        assert!(from_toml("").is_err());
    }
}
