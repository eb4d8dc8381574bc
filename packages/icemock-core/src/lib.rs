//! icemock core - an Icecast/Shoutcast server emulator for testing stream clients.
//!
//! The emulator answers a client with an ICY handshake and then streams a
//! looping byte buffer with in-band metadata frames injected at a fixed
//! interval. A `/drop` request cuts the connection after a configured byte
//! count so that client reconnection logic can be exercised.
//!
//! # Architecture
//!
//! - [`config`]: Immutable stream configuration shared by every connection
//! - [`stream`]: Stream source, metadata cycle, ICY encoding, and the
//!   per-connection interleaving state machine
//! - [`api`]: TCP listener, request parsing, and path routing
//! - [`lifecycle`]: Stopping a running server and waiting for readiness
//! - [`error`]: Centralized error types
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), icemock_core::ServerError> {
//! use icemock_core::{MockServer, StreamConfig, StreamSource};
//!
//! let config = StreamConfig::builder()
//!     .meta_interval(16000)
//!     .metadata(["Artist A - Song 1", "Artist B - Song 2"])
//!     .build()?;
//! let server = MockServer::bind(
//!     "127.0.0.1:0".parse().unwrap(),
//!     config,
//!     StreamSource::load(None)?,
//! )
//! .await?;
//! let handle = server.spawn()?;
//! // ... point the client under test at handle.local_addr() ...
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod protocol_constants;
pub mod stream;

// Re-export commonly used types at the crate root
pub use api::{handle_connection, ConnectionContext, MockServer, Route};
pub use config::{ConfigReport, StreamConfig, StreamConfigBuilder};
pub use error::{ConfigError, ConfigResult, ErrorCode, RequestError, ServerError};
pub use lifecycle::{wait_for_ready, ServerHandle};
pub use stream::{
    encode_handshake, IcyFormatter, InterleaveSession, MetadataCycle, SessionEnd, SessionOptions,
    SessionReport, StreamSource,
};
