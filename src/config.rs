//! Global configuration parsing and validation.

use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{AppError, Result};

fn default_bind_address() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_http_port() -> u16 {
    3000
}

fn default_stream_buffer_frames() -> usize {
    16
}

/// Per-capability settings table, deserialized from a
/// `[capabilities.<name>]` TOML section.
///
/// Each concrete capability extracts its own typed struct from this
/// value during `initialize`, so configuration errors surface as
/// initialization failures before any traffic is served.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySettings(Option<toml::Value>);

impl CapabilitySettings {
    /// Wrap a raw TOML section.
    #[must_use]
    pub fn new(value: toml::Value) -> Self {
        Self(Some(value))
    }

    /// Settings table absent from the configuration file.
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    /// Deserialize the section into a typed settings struct.
    ///
    /// An absent section deserializes from an empty table, so structs
    /// whose fields all carry serde defaults accept it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Init` if the section does not match the
    /// expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match &self.0 {
            Some(value) => value.clone(),
            None => toml::Value::Table(toml::map::Map::new()),
        };
        value
            .try_into()
            .map_err(|err| AppError::Init(format!("invalid capability settings: {err}")))
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// HTTP port for the gateway.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bounded per-stream frame buffer; a full buffer blocks the
    /// producer (backpressure) rather than queueing unboundedly.
    #[serde(default = "default_stream_buffer_frames")]
    pub stream_buffer_frames: usize,
    /// Raw per-capability settings sections, keyed by capability name.
    #[serde(default)]
    pub capabilities: HashMap<String, toml::Value>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            stream_buffer_frames: default_stream_buffer_frames(),
            capabilities: HashMap::new(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Socket address the listener binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    /// Settings section for a named capability.
    #[must_use]
    pub fn capability_settings(&self, name: &str) -> CapabilitySettings {
        self.capabilities
            .get(name)
            .cloned()
            .map_or_else(CapabilitySettings::empty, CapabilitySettings::new)
    }

    fn validate(&self) -> Result<()> {
        if self.stream_buffer_frames == 0 {
            return Err(AppError::Config(
                "stream_buffer_frames must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
