//! Configuration module for Mailcast.

use serde::Deserialize;
use std::path::Path;

use crate::{MailcastError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Timezone for console output (e.g., "Europe/Moscow", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/mailcast.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mailcast.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether the web API is enabled.
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (must be set if enabled).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Password reset token lifetime in seconds.
    #[serde(default = "default_password_reset_expiry")]
    pub password_reset_expiry_secs: u64,
}

fn default_web_enabled() -> bool {
    true
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    14 // 2 weeks
}

fn default_password_reset_expiry() -> u64 {
    3600
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            password_reset_expiry_secs: default_password_reset_expiry(),
        }
    }
}

/// Outbound mail backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Deliver through an SMTP relay.
    #[default]
    Smtp,
    /// Log messages instead of delivering them.
    Console,
}

/// TLS mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    Starttls,
    /// Implicit TLS (SMTPS).
    Tls,
    /// No encryption.
    None,
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Delivery backend.
    #[serde(default)]
    pub backend: MailBackend,
    /// SMTP server hostname.
    #[serde(default)]
    pub host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// TLS mode.
    #[serde(default)]
    pub tls: SmtpTls,
    /// Default sender address. Falls back to the SMTP username when empty.
    #[serde(default)]
    pub from: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u64 {
    10
}

impl MailConfig {
    /// Sender address used for outgoing mail.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            self.username.as_deref().unwrap_or("")
        } else {
            &self.from
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::default(),
            host: String::new(),
            port: default_smtp_port(),
            username: None,
            password: None,
            tls: SmtpTls::default(),
            from: String::new(),
            timeout_secs: default_smtp_timeout(),
        }
    }
}

/// In-process scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether `serve` also runs scheduled dispatch periodically.
    #[serde(default)]
    pub enabled: bool,
    /// Interval between scheduled runs in seconds.
    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
}

fn default_scheduler_interval() -> u64 {
    3600
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_scheduler_interval(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Outbound mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MailcastError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MailcastError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MAILCAST_JWT_SECRET`: JWT secret key
    /// - `MAILCAST_SMTP_PASSWORD`: SMTP password
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("MAILCAST_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }
        if let Ok(password) = std::env::var("MAILCAST_SMTP_PASSWORD") {
            if !password.is_empty() {
                self.mail.password = Some(password);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The web API is enabled but the JWT secret is not set
    /// - The SMTP backend is selected without a host or a sender address
    pub fn validate(&self) -> Result<()> {
        if self.web.enabled && self.web.jwt_secret.is_empty() {
            return Err(MailcastError::Config(
                "web API is enabled but jwt_secret is not set. \
                 Set it in config.toml or via MAILCAST_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.mail.backend == MailBackend::Smtp {
            if self.mail.host.is_empty() {
                return Err(MailcastError::Config(
                    "mail.host must be set for the smtp backend".to_string(),
                ));
            }
            if self.mail.sender().is_empty() {
                return Err(MailcastError::Config(
                    "mail.from or mail.username must be set for the smtp backend".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.timezone, "Europe/Moscow");

        assert_eq!(config.database.path, "data/mailcast.db");
        assert_eq!(config.database.max_connections, 5);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/mailcast.log");

        assert!(config.web.enabled);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 8000);
        assert!(config.web.cors_origins.is_empty());
        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_access_token_expiry_secs, 900);
        assert_eq!(config.web.jwt_refresh_token_expiry_days, 14);
        assert_eq!(config.web.password_reset_expiry_secs, 3600);

        assert_eq!(config.mail.backend, MailBackend::Smtp);
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.mail.tls, SmtpTls::Starttls);
        assert_eq!(config.mail.timeout_secs, 10);

        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_secs, 3600);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
timezone = "UTC"

[database]
path = "custom/db.sqlite"
max_connections = 2

[logging]
level = "debug"
file = "custom/logs/app.log"

[web]
enabled = true
host = "0.0.0.0"
port = 3000
cors_origins = ["http://localhost:3000"]
jwt_secret = "test-secret-key"
jwt_access_token_expiry_secs = 600
jwt_refresh_token_expiry_days = 7
password_reset_expiry_secs = 1800

[mail]
backend = "smtp"
host = "smtp.example.com"
port = 465
username = "robot@example.com"
password = "secret"
tls = "tls"
from = "News <news@example.com>"
timeout_secs = 30

[scheduler]
enabled = true
interval_secs = 600
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.timezone, "UTC");
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.web.jwt_secret, "test-secret-key");
        assert_eq!(config.web.jwt_access_token_expiry_secs, 600);
        assert_eq!(config.web.jwt_refresh_token_expiry_days, 7);
        assert_eq!(config.web.password_reset_expiry_secs, 1800);

        assert_eq!(config.mail.backend, MailBackend::Smtp);
        assert_eq!(config.mail.host, "smtp.example.com");
        assert_eq!(config.mail.port, 465);
        assert_eq!(config.mail.username.as_deref(), Some("robot@example.com"));
        assert_eq!(config.mail.password.as_deref(), Some("secret"));
        assert_eq!(config.mail.tls, SmtpTls::Tls);
        assert_eq!(config.mail.sender(), "News <news@example.com>");
        assert_eq!(config.mail.timeout_secs, 30);

        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_secs, 600);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[mail]
backend = "console"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.mail.backend, MailBackend::Console);
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.database.path, "data/mailcast.db");
        assert_eq!(config.web.port, 8000);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, "data/mailcast.db");
        assert_eq!(config.server.timezone, "Europe/Moscow");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(MailcastError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_backend() {
        let result = Config::parse("[mail]\nbackend = \"carrier-pigeon\"\n");
        assert!(matches!(result, Err(MailcastError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(MailcastError::Io(_))));
    }

    #[test]
    fn test_sender_falls_back_to_username() {
        let mut mail = MailConfig::default();
        assert_eq!(mail.sender(), "");

        mail.username = Some("robot@example.com".to_string());
        assert_eq!(mail.sender(), "robot@example.com");

        mail.from = "news@example.com".to_string();
        assert_eq!(mail.sender(), "news@example.com");
    }

    #[test]
    fn test_apply_env_overrides() {
        let original_jwt = std::env::var("MAILCAST_JWT_SECRET").ok();
        let original_smtp = std::env::var("MAILCAST_SMTP_PASSWORD").ok();

        std::env::set_var("MAILCAST_JWT_SECRET", "env-secret-key");
        std::env::set_var("MAILCAST_SMTP_PASSWORD", "env-smtp-password");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.web.jwt_secret, "env-secret-key");
        assert_eq!(config.mail.password.as_deref(), Some("env-smtp-password"));

        match original_jwt {
            Some(val) => std::env::set_var("MAILCAST_JWT_SECRET", val),
            None => std::env::remove_var("MAILCAST_JWT_SECRET"),
        }
        match original_smtp {
            Some(val) => std::env::set_var("MAILCAST_SMTP_PASSWORD", val),
            None => std::env::remove_var("MAILCAST_SMTP_PASSWORD"),
        }
    }

    #[test]
    fn test_validate_web_enabled_no_secret() {
        let mut config = Config::default();
        config.mail.backend = MailBackend::Console;

        let result = config.validate();
        if let Err(MailcastError::Config(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_smtp_requires_host() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();

        let result = config.validate();
        if let Err(MailcastError::Config(msg)) = result {
            assert!(msg.contains("mail.host"));
        } else {
            panic!("Expected Config error");
        }

        config.mail.host = "smtp.example.com".to_string();
        assert!(config.validate().is_err());

        config.mail.from = "news@example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_console_backend() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.mail.backend = MailBackend::Console;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.example.toml")).unwrap();

        assert_eq!(config.web.port, 8000);
        assert_eq!(config.mail.tls, SmtpTls::Starttls);
        assert_eq!(config.mail.password, None);
        assert!(!config.scheduler.enabled);
        assert!(config.validate().is_ok());
    }
}
