//! Per-connection interleaving state machine.
//!
//! A session pulls audio from a looping [`StreamSource`], writes it in
//! chunks, and injects a metadata frame each time `meta_interval` audio
//! bytes have gone out. Each iteration is decided by [`InterleaveSession::next_step`]
//! before any I/O happens, so the transitions can be exercised without a socket.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::source::{SourceCursor, StreamSource};
use crate::config::StreamConfig;
use crate::error::ConfigResult;
use crate::protocol_constants::{CHUNK_PACING_MS, MAX_CHUNK_SIZE};

/// What the session does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Write this many audio bytes from the cursor.
    EmitAudio(usize),
    /// Source exhausted; rewind and decide again without writing.
    LoopSource,
    /// Drop threshold reached; close without writing.
    Drop,
    /// Shutdown observed.
    Shutdown,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Drop simulation cut the connection.
    Terminated,
    /// A write failed; the client went away.
    Disconnected,
    /// The server is shutting down.
    Shutdown,
}

/// Summary returned when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub end: SessionEnd,
    /// Audio bytes written (metadata frames excluded).
    pub bytes_sent: u64,
    pub metadata_sent: u64,
}

/// Per-request switches for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Client sent `Icy-MetaData: 1`.
    pub wants_metadata: bool,
    /// Apply the configured drop threshold to this session.
    pub drop_armed: bool,
}

/// Mutable state of one streaming connection.
pub struct InterleaveSession {
    config: Arc<StreamConfig>,
    source: StreamSource,
    cursor: SourceCursor,
    metadata_enabled: bool,
    /// `None` when drop simulation is off for this session.
    drop_after: Option<u64>,
    bytes_sent: u64,
    bytes_since_meta: usize,
    metadata_index: usize,
    metadata_sent: u64,
}

impl InterleaveSession {
    /// Creates a session at the start of the source with zero bytes sent.
    ///
    /// # Errors
    ///
    /// Fails if the source is empty or the config is invalid; either would
    /// keep the loop from making progress.
    pub fn new(
        config: Arc<StreamConfig>,
        source: StreamSource,
        options: SessionOptions,
    ) -> ConfigResult<Self> {
        source.validate()?;
        config.validate()?;

        let drop_after = (options.drop_armed && config.drop_after_bytes > 0)
            .then_some(config.drop_after_bytes);

        Ok(Self {
            config,
            source,
            cursor: SourceCursor::default(),
            metadata_enabled: options.wants_metadata,
            drop_after,
            bytes_sent: 0,
            bytes_since_meta: 0,
            metadata_index: 0,
            metadata_sent: 0,
        })
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_since_meta(&self) -> usize {
        self.bytes_since_meta
    }

    pub fn metadata_index(&self) -> usize {
        self.metadata_index
    }

    /// Decides the next transition from the current counters.
    pub fn next_step(&self, shutdown: bool) -> Step {
        if shutdown {
            return Step::Shutdown;
        }

        let remaining = self.cursor.remaining(&self.source);
        let mut len = if self.metadata_enabled {
            remaining.min(self.config.meta_interval - self.bytes_since_meta)
        } else {
            remaining.min(MAX_CHUNK_SIZE)
        };
        if len == 0 {
            return Step::LoopSource;
        }

        if let Some(limit) = self.drop_after {
            if self.bytes_sent >= limit {
                return Step::Drop;
            }
            // Never overshoot the threshold
            let budget = limit - self.bytes_sent;
            len = len.min(usize::try_from(budget).unwrap_or(usize::MAX));
        }

        Step::EmitAudio(len)
    }

    /// Returns the next `len` audio bytes for a [`Step::EmitAudio`] without
    /// moving the cursor.
    pub fn chunk(&self, len: usize) -> Bytes {
        self.cursor.peek(&self.source, len)
    }

    /// Records `len` audio bytes as written and moves the cursor past them.
    ///
    /// Returns the metadata frame that must follow them, if one is due.
    pub fn advance(&mut self, len: usize) -> Option<Bytes> {
        self.cursor.advance(&self.source, len);
        self.bytes_sent += len as u64;
        self.bytes_since_meta += len;

        if !self.metadata_enabled || self.bytes_since_meta < self.config.meta_interval {
            return None;
        }

        let frame = self.config.metadata.frame_at(self.metadata_index);
        self.metadata_index = self.config.metadata.next_index(self.metadata_index);
        self.bytes_since_meta = 0;
        Some(frame)
    }

    fn report(&self, end: SessionEnd) -> SessionReport {
        SessionReport {
            end,
            bytes_sent: self.bytes_sent,
            metadata_sent: self.metadata_sent,
        }
    }

    /// Streams until the drop threshold, a write failure, or shutdown.
    ///
    /// Shutdown is checked at the top of every iteration and also interrupts
    /// a pending write or the pacing delay, so a client that stops reading
    /// cannot hold the session open. Counters only include bytes whose write
    /// completed.
    pub async fn run<W>(mut self, writer: &mut W, shutdown: &CancellationToken) -> SessionReport
    where
        W: AsyncWrite + Unpin,
    {
        let pacing = Duration::from_millis(CHUNK_PACING_MS);

        loop {
            let len = match self.next_step(shutdown.is_cancelled()) {
                Step::Shutdown => return self.report(SessionEnd::Shutdown),
                Step::Drop => {
                    log::info!(
                        "[Stream] Simulating connection drop after {} bytes",
                        self.bytes_sent
                    );
                    return self.report(SessionEnd::Terminated);
                }
                Step::LoopSource => {
                    self.cursor.rewind();
                    continue;
                }
                Step::EmitAudio(len) => len,
            };

            let chunk = self.chunk(len);
            if let Err(end) = write_or_shutdown(writer, &chunk, shutdown).await {
                return self.report(end);
            }
            let frame = self.advance(len);

            if let Some(frame) = &frame {
                if let Err(end) = write_or_shutdown(writer, frame, shutdown).await {
                    return self.report(end);
                }
                self.metadata_sent += 1;
            }
            log::trace!(
                "[Stream] Sent {} bytes (total={}, since_meta={}, meta={})",
                len,
                self.bytes_sent,
                self.bytes_since_meta,
                frame.is_some()
            );

            tokio::select! {
                _ = shutdown.cancelled() => return self.report(SessionEnd::Shutdown),
                _ = tokio::time::sleep(pacing) => {}
            }
        }
    }
}

/// Writes and flushes `bytes`, giving up if shutdown is signalled first.
async fn write_or_shutdown<W>(
    writer: &mut W,
    bytes: &[u8],
    shutdown: &CancellationToken,
) -> Result<(), SessionEnd>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    };

    tokio::select! {
        _ = shutdown.cancelled() => Err(SessionEnd::Shutdown),
        result = write => result.map_err(|e| {
            log::debug!("[Stream] Client disconnected: {}", e);
            SessionEnd::Disconnected
        }),
    }
}
