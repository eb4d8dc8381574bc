//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! `ICEMOCK_PORT`, `ICEMOCK_META_INTERVAL` and `ICEMOCK_DROP_AFTER` are read
//! by the CLI parser and merged in `main`; only settings without a flag-level
//! env binding are read here.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use icemock_core::protocol_constants::{
    DEFAULT_BITRATE, DEFAULT_CONTENT_TYPE, DEFAULT_META_INTERVAL, DEFAULT_PORT,
    DEFAULT_STATION_NAME, DEFAULT_STATION_URL,
};
use icemock_core::{ConfigResult, StreamConfig};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_address: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Fixture file to stream. Synthesized MP3-like data is used when unset
    /// or missing.
    pub stream_file: Option<PathBuf>,

    /// Audio bytes between ICY metadata blocks.
    pub meta_interval: usize,

    /// Station name sent as `icy-name`.
    /// Override: `ICEMOCK_STATION_NAME`
    pub station_name: String,

    /// Station URL sent as `icy-url`.
    pub station_url: String,

    /// Bitrate sent as `icy-br` (kbit/s).
    pub bitrate: u32,

    /// MIME type of the stream.
    pub content_type: String,

    /// Cut `/drop` connections after this many audio bytes (0 = never).
    pub drop_after_bytes: u64,

    /// Stream titles to cycle through.
    pub metadata: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            stream_file: None,
            meta_interval: DEFAULT_META_INTERVAL,
            station_name: DEFAULT_STATION_NAME.to_string(),
            station_url: DEFAULT_STATION_URL.to_string(),
            bitrate: DEFAULT_BITRATE,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            drop_after_bytes: 0,
            metadata: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("ICEMOCK_STATION_NAME") {
            self.station_name = name;
        }
    }

    /// Converts to icemock-core's StreamConfig type, validating it.
    pub fn to_stream_config(&self) -> ConfigResult<StreamConfig> {
        StreamConfig::builder()
            .station_name(&self.station_name)
            .station_url(&self.station_url)
            .bitrate(self.bitrate)
            .content_type(&self.content_type)
            .meta_interval(self.meta_interval)
            .drop_after_bytes(self.drop_after_bytes)
            .metadata(self.metadata.iter().cloned())
            .build()
    }
}
