//! Per-connection handling: read the request, route it, serve it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::request::{read_request_head, RequestHead};
use crate::config::StreamConfig;
use crate::error::ErrorCode;
use crate::stream::{encode_handshake, InterleaveSession, SessionOptions, StreamSource};

/// Everything a connection needs, cloned per accepted socket.
///
/// The config and source are read-only and shared; the token is the only
/// cross-session signal.
#[derive(Clone)]
pub struct ConnectionContext {
    pub config: Arc<StreamConfig>,
    pub source: StreamSource,
    pub shutdown: CancellationToken,
}

/// What a request path asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// ICY stream; `drop_armed` applies the configured drop threshold.
    Stream { drop_armed: bool },
    Status,
    Config,
    Shutdown,
}

impl Route {
    /// Maps a request path to a route. Unknown paths stream.
    pub fn from_path(path: &str) -> Self {
        match path {
            "/shutdown" => Self::Shutdown,
            "/status" => Self::Status,
            "/config" => Self::Config,
            "/drop" => Self::Stream { drop_armed: true },
            _ => Self::Stream { drop_armed: false },
        }
    }
}

/// Handles one accepted connection until it is finished.
///
/// The connection is owned for the whole call and closed when it returns,
/// whatever the outcome.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, ctx: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // BufReader passes writes straight through to the socket
    let mut conn = BufReader::new(stream);

    // A client that never finishes its request must not outlive shutdown
    let head = tokio::select! {
        _ = ctx.shutdown.cancelled() => {
            log::debug!("[Connection] {} closed by shutdown before request", peer);
            return;
        }
        head = read_request_head(&mut conn) => match head {
            Ok(head) => head,
            Err(e) => {
                log::debug!("[Connection] {} bad request ({}): {}", peer, e.code(), e);
                return;
            }
        },
    };

    let route = Route::from_path(&head.path);
    log::debug!(
        "[Connection] {} {} {} -> {:?}",
        peer,
        head.method,
        head.path,
        route
    );

    let result = match route {
        Route::Stream { drop_armed } => {
            serve_stream(&mut conn, peer, &head, drop_armed, &ctx).await;
            Ok(())
        }
        Route::Status => write_plain(&mut conn, "text/plain", b"OK\n").await,
        Route::Config => match serde_json::to_vec(&ctx.config.report()) {
            Ok(body) => write_plain(&mut conn, "application/json", &body).await,
            Err(e) => {
                log::error!("[Connection] Failed to serialize config: {}", e);
                Ok(())
            }
        },
        Route::Shutdown => {
            let result = write_plain(&mut conn, "text/plain", b"OK\n").await;
            log::info!("[Connection] Shutdown requested by {}", peer);
            ctx.shutdown.cancel();
            result
        }
    };

    if let Err(e) = result {
        log::debug!("[Connection] {} write failed: {}", peer, e);
    }
}

async fn serve_stream<S>(
    conn: &mut S,
    peer: SocketAddr,
    head: &RequestHead,
    drop_armed: bool,
    ctx: &ConnectionContext,
) where
    S: AsyncWrite + Unpin,
{
    let options = SessionOptions {
        wants_metadata: head.wants_metadata(),
        drop_armed,
    };
    let session =
        match InterleaveSession::new(Arc::clone(&ctx.config), ctx.source.clone(), options) {
            Ok(session) => session,
            Err(e) => {
                log::error!("[Stream] {} cannot start session: {}", peer, e);
                return;
            }
        };

    log::info!(
        "[Stream] New connection: client={}, metadata={}, drop={}",
        peer,
        options.wants_metadata,
        drop_armed
    );

    let handshake = encode_handshake(&ctx.config, options.wants_metadata);
    let sent = async {
        conn.write_all(&handshake).await?;
        conn.flush().await
    };
    if let Err(e) = sent.await {
        log::debug!("[Stream] {} disconnected during handshake: {}", peer, e);
        return;
    }

    let report = session.run(conn, &ctx.shutdown).await;
    log::info!(
        "[Stream] Connection ended: client={}, end={:?}, bytes={}, metadata_blocks={}",
        peer,
        report.end,
        report.bytes_sent,
        report.metadata_sent
    );
}

/// Writes a minimal `HTTP/1.0 200 OK` response.
async fn write_plain<S>(conn: &mut S, content_type: &str, body: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    );
    conn.write_all(head.as_bytes()).await?;
    conn.write_all(body).await?;
    conn.flush().await
}
