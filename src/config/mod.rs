//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`MCP_TRANSPORT_*`)
//! - CLI arguments (applied by the binary)
//!
//! Raw values land in [`Config`]; [`Config::validate`] turns them into the
//! immutable [`ServerConfig`] and [`SessionConfig`] the server runs with.
//! Any out-of-range value aborts startup.

mod session;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::ServerConfig;

pub use session::{
    SessionConfig, SessionSettings, CLEANUP_INTERVAL_MS_RANGE, KEEP_ALIVE_INTERVAL_MS_RANGE,
    MAX_COUNT_RANGE, MAX_MISSED_HEARTBEATS_RANGE, TIMEOUT_MS_RANGE,
};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "MCP_TRANSPORT_";

/// Configuration errors. All of them abort startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Numeric field outside its bounds.
    #[error("{field} = {value} is out of range ({min}..={max})")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u64,
        /// Inclusive lower bound
        min: u64,
        /// Inclusive upper bound
        max: u64,
    },

    /// Cross-field rule violated.
    #[error("{0}")]
    Constraint(String),

    /// Value could not be parsed or is not acceptable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field or variable name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Config file could not be read.
    #[error("failed to read config file {path}: {reason}")]
    Read {
        /// File path
        path: String,
        /// Underlying error
        reason: String,
    },

    /// Config file is not valid TOML for [`Config`].
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Listener and routing configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Session lifecycle configuration
    #[serde(default)]
    pub session: SessionSettings,

    /// Filter chain configuration
    #[serde(default)]
    pub security: SecuritySettings,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Default config file location (`<config dir>/mcp-transport/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mcp-transport").join("config.toml"))
    }

    /// Load the default config file if it exists, otherwise defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are errors rather than silently ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&var, "PORT")? {
            self.server.port = port;
        }
        if let Some(flag) = parse_var(&var, "LEGACY_SSE")? {
            self.server.legacy_sse = flag;
        }
        if let Some(size) = parse_var(&var, "MAX_BODY_SIZE")? {
            self.server.max_body_size = size;
        }

        if let Some(v) = parse_var(&var, "SESSION_TIMEOUT_MS")? {
            self.session.timeout_ms = v;
        }
        if let Some(v) = parse_var(&var, "CLEANUP_INTERVAL_MS")? {
            self.session.cleanup_interval_ms = v;
        }
        if let Some(v) = parse_var(&var, "KEEP_ALIVE_INTERVAL_MS")? {
            self.session.keep_alive_interval_ms = v;
        }
        if let Some(v) = parse_var(&var, "MAX_MISSED_HEARTBEATS")? {
            self.session.max_missed_heartbeats = v;
        }
        if let Some(v) = parse_var(&var, "MAX_SESSIONS")? {
            self.session.max_count = v;
        }

        if let Some(list) = var("ALLOWED_HOSTS") {
            self.security.allowed_hosts = split_list(&list);
        }
        if let Some(list) = var("ALLOWED_ORIGINS") {
            self.security.allowed_origins = split_list(&list);
        }
        if let Some(v) = parse_var(&var, "RATE_LIMIT_REQUESTS")? {
            self.security.rate_limit_requests = v;
        }
        if let Some(v) = parse_var(&var, "RATE_LIMIT_WINDOW_SECS")? {
            self.security.rate_limit_window_secs = v;
        }

        Ok(())
    }

    /// Validate every section, returning the bound runtime configuration.
    pub fn validate(&self) -> Result<(ServerConfig, SessionConfig), ConfigError> {
        let server = ServerConfig::from_settings(&self.server, &self.security)?;
        let session = SessionConfig::new(&self.session)?;
        Ok((server, session))
    }
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to (IP literal or `localhost`)
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Mount the deprecated `/sse` + `/messages` endpoints
    pub legacy_sse: bool,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            legacy_sse: false,
            max_body_size: 4 * 1024 * 1024, // 4 MB
        }
    }
}

impl ServerSettings {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Filter chain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Accepted `Host` header values (empty = any)
    pub allowed_hosts: Vec<String>,

    /// Accepted `Origin` header values (empty = any)
    pub allowed_origins: Vec<String>,

    /// Requests admitted per window (0 = unlimited)
    pub rate_limit_requests: u32,

    /// Rate limit window length in seconds
    pub rate_limit_window_secs: u64,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            allowed_hosts: vec![
                "127.0.0.1".to_string(),
                "localhost".to_string(),
                "[::1]".to_string(),
            ],
            allowed_origins: Vec::new(),
            rate_limit_requests: 0,
            rate_limit_window_secs: 60,
        }
    }
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                field: format!("{ENV_PREFIX}{name}"),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.legacy_sse);
        assert_eq!(config.session.timeout_ms, 1_800_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_listen_addr() {
        let settings = ServerSettings::default();
        assert_eq!(settings.listen_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 9090
            legacy_sse = true

            [session]
            timeout_ms = 120000
            keep_alive_interval_ms = 10000

            [security]
            allowed_origins = ["https://app.example.com"]
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert!(config.server.legacy_sse);
        assert_eq!(config.session.timeout_ms, 120_000);
        // Unspecified fields keep their defaults
        assert_eq!(config.session.max_missed_heartbeats, 3);
        assert_eq!(config.security.allowed_origins.len(), 1);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4242\n\n[session]\nmax_count = 5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4242);
        assert_eq!(config.session.max_count, 5);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MCP_TRANSPORT_PORT", "8088"),
            ("MCP_TRANSPORT_LEGACY_SSE", "true"),
            ("MCP_TRANSPORT_MAX_SESSIONS", "12"),
            ("MCP_TRANSPORT_ALLOWED_ORIGINS", "https://a.test, https://b.test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 8088);
        assert!(config.server.legacy_sse);
        assert_eq!(config.session.max_count, 12);
        assert_eq!(
            config.security.allowed_origins,
            vec!["https://a.test", "https://b.test"]
        );
    }

    #[test]
    fn test_env_unparseable_value_is_error() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == "MCP_TRANSPORT_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_session() {
        let mut config = Config::default();
        config.session.max_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "max_count",
                ..
            })
        ));
    }
}
