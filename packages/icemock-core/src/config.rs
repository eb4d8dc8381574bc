//! Immutable per-server stream configuration.

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};
use crate::protocol_constants::{
    DEFAULT_BITRATE, DEFAULT_CONTENT_TYPE, DEFAULT_META_INTERVAL, DEFAULT_STATION_NAME,
    DEFAULT_STATION_URL,
};
use crate::stream::MetadataCycle;

/// What every streaming session on a server advertises and emits.
///
/// Built once (see [`StreamConfig::builder`]) and shared read-only behind an
/// `Arc` by every connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub station_name: String,
    pub station_url: String,
    /// Advertised bitrate (kbit/s). Informational only.
    pub bitrate: u32,
    pub content_type: String,
    /// Audio bytes between two metadata frames. Always > 0.
    pub meta_interval: usize,
    /// Audio bytes after which a `/drop` session is cut (0 = never).
    pub drop_after_bytes: u64,
    pub metadata: MetadataCycle,
}

impl StreamConfig {
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }

    /// Returns the fields reported by the `/config` endpoint.
    pub fn report(&self) -> ConfigReport<'_> {
        ConfigReport {
            station_name: &self.station_name,
            bitrate: self.bitrate,
            meta_interval: self.meta_interval,
            content_type: &self.content_type,
            drop_after_bytes: self.drop_after_bytes,
        }
    }

    /// Checks invariants that fields set directly may have broken.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.meta_interval == 0 {
            return Err(ConfigError::ZeroMetaInterval);
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            station_name: DEFAULT_STATION_NAME.to_string(),
            station_url: DEFAULT_STATION_URL.to_string(),
            bitrate: DEFAULT_BITRATE,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            meta_interval: DEFAULT_META_INTERVAL,
            drop_after_bytes: 0,
            metadata: MetadataCycle::empty(),
        }
    }
}

/// JSON body of the `/config` endpoint.
#[derive(Debug, Serialize)]
pub struct ConfigReport<'a> {
    pub station_name: &'a str,
    pub bitrate: u32,
    pub meta_interval: usize,
    pub content_type: &'a str,
    pub drop_after_bytes: u64,
}

/// Builder for [`StreamConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct StreamConfigBuilder {
    station_name: Option<String>,
    station_url: Option<String>,
    bitrate: Option<u32>,
    content_type: Option<String>,
    meta_interval: Option<usize>,
    drop_after_bytes: Option<u64>,
    metadata: Vec<String>,
}

impl StreamConfigBuilder {
    pub fn station_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = Some(name.into());
        self
    }

    pub fn station_url(mut self, url: impl Into<String>) -> Self {
        self.station_url = Some(url.into());
        self
    }

    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn meta_interval(mut self, interval: usize) -> Self {
        self.meta_interval = Some(interval);
        self
    }

    pub fn drop_after_bytes(mut self, bytes: u64) -> Self {
        self.drop_after_bytes = Some(bytes);
        self
    }

    /// Sets the titles to cycle through. Empty means the default title.
    pub fn metadata<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata = titles.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the configuration, encoding every metadata title up front.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroMetaInterval`] or
    /// [`ConfigError::MetadataTooLong`].
    pub fn build(self) -> ConfigResult<StreamConfig> {
        let defaults = StreamConfig::default();
        let config = StreamConfig {
            station_name: self.station_name.unwrap_or(defaults.station_name),
            station_url: self.station_url.unwrap_or(defaults.station_url),
            bitrate: self.bitrate.unwrap_or(defaults.bitrate),
            content_type: self.content_type.unwrap_or(defaults.content_type),
            meta_interval: self.meta_interval.unwrap_or(defaults.meta_interval),
            drop_after_bytes: self.drop_after_bytes.unwrap_or(defaults.drop_after_bytes),
            metadata: MetadataCycle::new(self.metadata)?,
        };
        config.validate()?;
        Ok(config)
    }
}
