use serde::{Deserialize, Serialize};

use super::engine::EngineConfig;
use super::errors::ConfigError;
use super::forward::ForwardConfig;
use super::logging::LoggingConfig;
use super::server::{ListenerConfig, ServerConfig};
use crate::destination::{NetworkFamily, Transport};

/// Main configuration structure for Cyclone DNS.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Ports, bind address, listener descriptors.
    #[serde(default)]
    pub server: ServerConfig,

    /// Cycle engine sizing and resend policy.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Built-in forward handler settings.
    #[serde(default)]
    pub forward: ForwardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. cyclone-dns.toml in current directory
    /// 3. /etc/cyclone-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("cyclone-dns.toml").exists() {
            Self::from_file("cyclone-dns.toml")?
        } else if std::path::Path::new("/etc/cyclone-dns/config.toml").exists() {
            Self::from_file("/etc/cyclone-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.normalize_listeners();
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.udp_port {
            self.server.udp_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(upstream) = overrides.upstream {
            self.forward.upstream = upstream;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// If no listeners are declared, synthesize the default UDP listener
    /// from the bind address and UDP port.
    fn normalize_listeners(&mut self) {
        if self.server.listeners.is_empty() {
            let family = if self.server.bind_address.contains(':') {
                NetworkFamily::Inet6
            } else {
                NetworkFamily::Inet4
            };
            self.server.listeners.push(ListenerConfig {
                family,
                transport: Transport::Udp,
                address: self.server.bind_address.clone(),
                port: self.server.udp_port,
            });
        }
    }

    /// Structural validation. Transport and thread-count rejection happens
    /// at engine creation, where it maps to the closed error codes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.udp_port == 0 {
            return Err(ConfigError::Validation("UDP port cannot be 0".to_string()));
        }
        if self.server.listeners.is_empty() {
            return Err(ConfigError::Validation(
                "No listeners configured".to_string(),
            ));
        }
        for listener in &self.server.listeners {
            if listener.port == 0 {
                return Err(ConfigError::Validation(format!(
                    "Listener on '{}' has port 0",
                    listener.address
                )));
            }
        }
        Ok(())
    }
}

/// Command-line overrides for configuration.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub udp_port: Option<u16>,
    pub bind_address: Option<String>,
    pub upstream: Option<String>,
    pub log_level: Option<String>,
}
