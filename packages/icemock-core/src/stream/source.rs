//! Finite "audio" byte buffer that a session loops over forever.

use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ConfigError, ConfigResult};
use crate::protocol_constants::{DUMMY_FRAME_HEADER, DUMMY_FRAME_SIZE, DUMMY_STREAM_SIZE};

/// Immutable stream content shared by every session.
///
/// Cloning is an `Arc` bump; sessions keep their own cursor (see
/// [`SourceCursor`]) so concurrent listeners never observe each other's
/// position.
#[derive(Debug, Clone)]
pub struct StreamSource {
    data: Bytes,
}

impl StreamSource {
    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Reads a fixture file in full.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let data = std::fs::read(path).map_err(|source| ConfigError::StreamFile {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "[Stream] Loaded {} bytes from {}",
            data.len(),
            path.display()
        );
        Ok(Self::from_bytes(data))
    }

    /// Synthesizes `size` bytes of MP3-like frames.
    ///
    /// Each 417-byte frame starts with an MPEG-1 Layer III header and is
    /// zero-filled after it. The last frame is truncated to fit.
    pub fn dummy_mp3(size: usize) -> Self {
        let mut data = BytesMut::with_capacity(size + DUMMY_FRAME_SIZE);
        while data.len() < size {
            data.put_slice(&DUMMY_FRAME_HEADER);
            data.put_bytes(0, DUMMY_FRAME_SIZE - DUMMY_FRAME_HEADER.len());
        }
        data.truncate(size);
        Self { data: data.freeze() }
    }

    /// Loads the fixture at `path`, or synthesizes data if there is none.
    ///
    /// A configured path that does not exist falls back to synthesized data;
    /// a path that exists but cannot be read is an error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                log::warn!(
                    "[Stream] Stream file {} not found, using synthesized data",
                    path.display()
                );
                Ok(Self::dummy_mp3(DUMMY_STREAM_SIZE))
            }
            None => Ok(Self::dummy_mp3(DUMMY_STREAM_SIZE)),
        }
    }

    /// Rejects sources a session could not make progress on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.data.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}

/// Per-session read position over a [`StreamSource`].
#[derive(Debug, Clone, Default)]
pub struct SourceCursor {
    position: usize,
}

impl SourceCursor {
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left before the cursor must wrap.
    pub fn remaining(&self, source: &StreamSource) -> usize {
        source.len().saturating_sub(self.position)
    }

    /// Returns the next `len` bytes without copying.
    ///
    /// `len` must not exceed [`remaining`](Self::remaining).
    pub fn peek(&self, source: &StreamSource, len: usize) -> Bytes {
        source.data.slice(self.position..self.position + len)
    }

    /// Moves forward by `len`, wrapping to the start once the end is reached.
    pub fn advance(&mut self, source: &StreamSource, len: usize) {
        self.position += len;
        if self.position >= source.len() {
            self.position = 0;
        }
    }

    /// Jumps back to the start of the source.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}
