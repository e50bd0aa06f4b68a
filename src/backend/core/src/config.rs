//! Configuration management.

use crate::rbac::models::SubscriptionTier;
use crate::telemetry::LoggingConfig;
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `STRIVE__SERVER__PORT=9090`.
const ENV_PREFIX: &str = "STRIVE";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Access-control policy flags
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Only the server binary needs it.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Run embedded migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

/// What `can_access_route` answers for a path no route rule covers.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRoutePolicy {
    /// Unlisted paths are open to any authenticated user.
    #[default]
    Allow,
    /// Unlisted paths are closed to everyone below ADMIN.
    Deny,
}

/// How a failed audit write after a successful mutation is treated.
///
/// Neither policy rolls back the primary write.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditPolicy {
    /// Log and count the failure, report success to the caller.
    #[default]
    BestEffort,
    /// Surface the failure to the caller.
    Required,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub unknown_route_policy: UnknownRoutePolicy,

    #[serde(default)]
    pub audit_policy: AuditPolicy,

    /// Minimum user and organization tier for transaction mutations
    #[serde(default = "default_transactions_min_tier")]
    pub transactions_min_tier: SubscriptionTier,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            unknown_route_policy: UnknownRoutePolicy::default(),
            audit_policy: AuditPolicy::default(),
            transactions_min_tier: default_transactions_min_tier(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_run_migrations() -> bool { true }
fn default_transactions_min_tier() -> SubscriptionTier { SubscriptionTier::Growth }

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.database.url.is_none());
        assert_eq!(cfg.access.unknown_route_policy, UnknownRoutePolicy::Allow);
        assert_eq!(cfg.access.audit_policy, AuditPolicy::BestEffort);
        assert_eq!(cfg.access.transactions_min_tier, SubscriptionTier::Growth);
    }

    #[test]
    fn test_from_toml_str() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 9090

            [access]
            unknown_route_policy = "deny"
            audit_policy = "required"
            transactions_min_tier = "ELITE"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.access.unknown_route_policy, UnknownRoutePolicy::Deny);
        assert_eq!(cfg.access.audit_policy, AuditPolicy::Required);
        assert_eq!(cfg.access.transactions_min_tier, SubscriptionTier::Elite);
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let result = Config::from_toml_str(
            r#"
            [access]
            transactions_min_tier = "PLATINUM"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://localhost/strive\"\nmax_connections = 5"
        )
        .unwrap();

        let cfg = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.database.url.as_deref(), Some("postgres://localhost/strive"));
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.database.min_connections, 2);
    }
}
