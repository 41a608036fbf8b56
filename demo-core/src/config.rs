//! Hub configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `DEMO_HUB__*` environment variables. CLI flags are applied on
//! top by the hub.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ports::PortAllocator;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HubConfig {
    /// Interface every listener binds to.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base seed for all service RNGs. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Range used when a service's port is already taken.
    #[serde(default)]
    pub fallback_ports: PortRange,
    /// Per-service overrides keyed by service name.
    #[serde(default)]
    pub services: HashMap<String, ServiceSettings>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            log_level: default_log_level(),
            seed: None,
            fallback_ports: PortRange::default(),
            services: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 8100,
            end: 8199,
        }
    }
}

impl PortRange {
    pub fn allocator(&self) -> PortAllocator {
        PortAllocator::new(self.start, self.end)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceSettings {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            port: None,
            enabled: true,
        }
    }
}

impl HubConfig {
    /// Loads the configuration. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(Environment::with_prefix("DEMO_HUB").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn service(&self, name: &str) -> ServiceSettings {
        self.services.get(name).cloned().unwrap_or_default()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.service(name).enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = HubConfig::from_toml_str("").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.seed, None);
        assert_eq!(config.fallback_ports, PortRange::default());
        assert!(config.is_enabled("carbon"));
    }

    #[test]
    fn test_service_overrides() {
        let config = HubConfig::from_toml_str(
            r#"
            host = "127.0.0.1"
            seed = 42

            [fallback_ports]
            start = 9000
            end = 9010

            [services.carbon]
            port = 9100

            [services.fraud]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.fallback_ports.start, 9000);
        assert_eq!(config.service("carbon").port, Some(9100));
        assert!(config.is_enabled("carbon"));
        assert!(!config.is_enabled("fraud"));
        assert_eq!(config.service("iot").port, None);
    }
}
