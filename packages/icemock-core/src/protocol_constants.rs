//! Fixed protocol constants and emulator defaults.
//!
//! The ICY values are defined by the Shoutcast/Icecast wire format and
//! changing them would break clients that parse the stream.

// ─────────────────────────────────────────────────────────────────────────────
// ICY Protocol (Shoutcast/Icecast metadata)
// ─────────────────────────────────────────────────────────────────────────────

/// Status line sent in place of an HTTP/1.x status line.
pub const ICY_STATUS_LINE: &str = "ICY 200 OK";

/// Genre advertised in every handshake.
pub const ICY_GENRE: &str = "Test";

/// Size of one ICY metadata block unit (bytes).
///
/// The length byte in front of every metadata frame counts these units.
pub const ICY_BLOCK_SIZE: usize = 16;

/// Largest encodable metadata payload (255 blocks of 16 bytes).
pub const ICY_MAX_METADATA_LEN: usize = u8::MAX as usize * ICY_BLOCK_SIZE;

/// Request header a client sends to opt in to in-band metadata.
pub const ICY_METADATA_HEADER: &str = "icy-metadata";

/// Title injected when no metadata cycle is configured.
pub const DEFAULT_STREAM_TITLE: &str = "Test Artist - Test Song";

// ─────────────────────────────────────────────────────────────────────────────
// Emulator Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8765;

/// Default ICY metadata interval (bytes between metadata blocks).
pub const DEFAULT_META_INTERVAL: usize = 8192;

/// Default advertised bitrate (kbit/s).
pub const DEFAULT_BITRATE: u32 = 128;

/// Default station name.
pub const DEFAULT_STATION_NAME: &str = "Test Radio Station";

/// Default station URL.
pub const DEFAULT_STATION_URL: &str = "http://localhost:8765";

/// Default content type.
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound on a single audio write when metadata is disabled.
///
/// Keeps writes small; not significant to the protocol.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// Delay between audio chunks (ms).
///
/// Reproduces realistic delivery timing for client-side buffering tests.
pub const CHUNK_PACING_MS: u64 = 10;

/// Size of the synthesized stream when no fixture file is available.
pub const DUMMY_STREAM_SIZE: usize = 64 * 1024;

/// Frame length of the synthesized MP3-like data (128 kbit/s at 44.1 kHz).
pub const DUMMY_FRAME_SIZE: usize = 417;

/// MPEG-1 Layer III frame header used by the synthesized data.
pub const DUMMY_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

// ─────────────────────────────────────────────────────────────────────────────
// Request Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum size of a request head (request line + headers).
pub const MAX_REQUEST_HEAD_SIZE: usize = 8 * 1024;

/// Interval between readiness probes in [`crate::wait_for_ready`] (ms).
pub const READY_POLL_INTERVAL_MS: u64 = 100;
