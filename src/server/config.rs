//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::{ConfigError, SecuritySettings, ServerSettings};

/// Accepted request body sizes (bytes)
pub const MAX_BODY_SIZE_RANGE: (u64, u64) = (1024, 64 * 1024 * 1024);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Mount the legacy `/sse` + `/messages` endpoints
    pub legacy_sse: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Filter chain settings
    pub security: SecuritySettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            legacy_sse: false,
            max_body_size: 4 * 1024 * 1024, // 4MB
            security: SecuritySettings::default(),
        }
    }
}

impl ServerConfig {
    /// Validate raw listener and security settings.
    pub fn from_settings(
        server: &ServerSettings,
        security: &SecuritySettings,
    ) -> Result<Self, ConfigError> {
        let ip = parse_host(&server.host)?;

        if server.port == 0 {
            return Err(ConfigError::OutOfRange {
                field: "port",
                value: 0,
                min: 1,
                max: u64::from(u16::MAX),
            });
        }

        let (min, max) = MAX_BODY_SIZE_RANGE;
        let size = server.max_body_size as u64;
        if !(min..=max).contains(&size) {
            return Err(ConfigError::OutOfRange {
                field: "max_body_size",
                value: size,
                min,
                max,
            });
        }

        if security.rate_limit_requests > 0 && security.rate_limit_window_secs == 0 {
            return Err(ConfigError::Constraint(
                "rate_limit_window_secs must be positive when rate limiting is enabled"
                    .to_string(),
            ));
        }

        Ok(Self {
            addr: SocketAddr::new(ip, server.port),
            legacy_sse: server.legacy_sse,
            max_body_size: server.max_body_size,
            security: security.clone(),
        })
    }

    /// Create with custom port
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Bind to all interfaces
    pub fn bind_all(mut self) -> Self {
        self.addr.set_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        self
    }

    /// Set address directly
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Enable or disable the legacy endpoints
    pub fn with_legacy_sse(mut self, enabled: bool) -> Self {
        self.legacy_sse = enabled;
        self
    }

    /// Set max body size
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Replace the filter chain settings
    pub fn with_security(mut self, security: SecuritySettings) -> Self {
        self.security = security;
        self
    }
}

fn parse_host(host: &str) -> Result<IpAddr, ConfigError> {
    let host = host.trim();
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| ConfigError::Invalid {
            field: "host".to_string(),
            reason: format!("{host:?} is not an IP literal or localhost"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let config =
            ServerConfig::from_settings(&ServerSettings::default(), &SecuritySettings::default())
                .unwrap();
        assert_eq!(config.addr, "127.0.0.1:3000".parse().unwrap());
        assert!(!config.legacy_sse);
    }

    #[test]
    fn test_localhost_and_ipv6() {
        let mut settings = ServerSettings {
            host: "localhost".to_string(),
            ..ServerSettings::default()
        };
        let config = ServerConfig::from_settings(&settings, &SecuritySettings::default()).unwrap();
        assert!(config.addr.ip().is_loopback());

        settings.host = "[::1]".to_string();
        let config = ServerConfig::from_settings(&settings, &SecuritySettings::default()).unwrap();
        assert!(config.addr.is_ipv6());
    }

    #[test]
    fn test_rejects_hostname() {
        let settings = ServerSettings {
            host: "example.com".to_string(),
            ..ServerSettings::default()
        };
        let err = ServerConfig::from_settings(&settings, &SecuritySettings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_port_zero() {
        let settings = ServerSettings {
            port: 0,
            ..ServerSettings::default()
        };
        assert!(matches!(
            ServerConfig::from_settings(&settings, &SecuritySettings::default()),
            Err(ConfigError::OutOfRange { field: "port", .. })
        ));
    }

    #[test]
    fn test_body_size_bounds() {
        for size in [512, 65 * 1024 * 1024] {
            let settings = ServerSettings {
                max_body_size: size,
                ..ServerSettings::default()
            };
            assert!(matches!(
                ServerConfig::from_settings(&settings, &SecuritySettings::default()),
                Err(ConfigError::OutOfRange {
                    field: "max_body_size",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_builders() {
        let config = ServerConfig::default()
            .with_port(8080)
            .bind_all()
            .with_legacy_sse(true);
        assert_eq!(config.addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.legacy_sse);
    }
}
