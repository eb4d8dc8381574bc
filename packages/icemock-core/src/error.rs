//! Centralized error types for the icemock core library.
//!
//! Transport failures inside a streaming session are not errors here: a
//! client hanging up mid-stream is an ordinary session outcome (see
//! [`SessionEnd`](crate::stream::SessionEnd)). The types below cover what
//! can go wrong before streaming starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol_constants::ICY_MAX_METADATA_LEN;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and reports.
    fn code(&self) -> &'static str;
}

/// Invalid stream configuration, detected when the server is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Metadata interval of zero would inject a frame before every byte.
    #[error("Metadata interval must be greater than zero")]
    ZeroMetaInterval,

    /// The stream source has no bytes to loop over.
    #[error("Stream source is empty")]
    EmptySource,

    /// A metadata title does not fit the one-byte length prefix.
    #[error(
        "Metadata title {title:?} encodes to {encoded_len} bytes (max {})",
        ICY_MAX_METADATA_LEN
    )]
    MetadataTooLong { title: String, encoded_len: usize },

    /// The stream fixture exists but could not be read.
    #[error("Failed to read stream file {}: {source}", .path.display())]
    StreamFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ZeroMetaInterval => "zero_meta_interval",
            Self::EmptySource => "empty_source",
            Self::MetadataTooLong { .. } => "metadata_too_long",
            Self::StreamFile { .. } => "stream_file_unreadable",
        }
    }
}

/// A request head that could not be parsed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Client closed the connection before finishing the request head.
    #[error("Connection closed before request head was complete")]
    Incomplete,

    /// Request head exceeded the size limit.
    #[error("Request head exceeds {0} bytes")]
    TooLarge(usize),

    /// Request line was not `METHOD PATH [VERSION]`.
    #[error("Malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// Socket error while reading the request.
    #[error("I/O error reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for RequestError {
    fn code(&self) -> &'static str {
        match self {
            Self::Incomplete => "request_incomplete",
            Self::TooLarge(_) => "request_too_large",
            Self::MalformedRequestLine(_) => "malformed_request_line",
            Self::Io(_) => "request_io_error",
        }
    }
}

/// Errors that can occur when starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("Failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    /// Configuration rejected before binding.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ErrorCode for ServerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Bind(_) => "bind_failed",
            Self::Config(e) => e.code(),
        }
    }
}

/// Convenient Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_forwards_config_code() {
        let err = ServerError::from(ConfigError::EmptySource);
        assert_eq!(err.code(), "empty_source");
        assert!(err.to_string().contains("Stream source is empty"));
    }

    #[test]
    fn metadata_too_long_reports_limit() {
        let err = ConfigError::MetadataTooLong {
            title: "x".into(),
            encoded_len: 5000,
        };
        assert_eq!(err.code(), "metadata_too_long");
        assert!(err.to_string().contains("4080"));
    }
}
