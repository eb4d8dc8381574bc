//! TCP listener and connection dispatch.
//!
//! The listener speaks raw TCP rather than going through an HTTP framework:
//! the stream reply starts with `ICY 200 OK`, which no HTTP/1.x stack will
//! emit.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::ServerError;
use crate::lifecycle::ServerHandle;
use crate::stream::StreamSource;

pub mod connection;
pub mod request;

pub use connection::{handle_connection, ConnectionContext, Route};
pub use request::{read_request_head, RequestHead};

/// A bound, not yet serving, emulator instance.
pub struct MockServer {
    listener: TcpListener,
    ctx: ConnectionContext,
}

impl MockServer {
    /// Validates the configuration and source, then binds `addr`.
    ///
    /// Configuration problems are reported here rather than on the first
    /// connection.
    pub async fn bind(
        addr: SocketAddr,
        config: StreamConfig,
        source: StreamSource,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        source.validate()?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(1024)?;

        Ok(Self {
            listener,
            ctx: ConnectionContext {
                config: Arc::new(config),
                source,
                shutdown: CancellationToken::new(),
            },
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Token that stops the accept loop and every session when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Accepts connections until shutdown, one task per connection.
    pub async fn serve(self) {
        let shutdown = self.ctx.shutdown.clone();
        if let Ok(addr) = self.listener.local_addr() {
            log::info!("[Server] Listening on {}", addr);
        }

        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::warn!("[Server] Accept failed: {}", e);
                        continue;
                    }
                },
            };

            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, ctx).await;
            });
        }

        log::info!("[Server] Accept loop stopped");
    }

    /// Runs [`serve`](Self::serve) on a background task.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.local_addr()?;
        let shutdown = self.shutdown_token();
        let task = tokio::spawn(self.serve());
        Ok(ServerHandle::new(local_addr, shutdown, task))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::error::ConfigError;
    use crate::lifecycle::wait_for_ready;

    fn localhost() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    async fn get(addr: SocketAddr, request: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        stream
    }

    #[tokio::test]
    async fn empty_source_fails_before_binding() {
        let result = MockServer::bind(
            localhost(),
            StreamConfig::default(),
            StreamSource::from_bytes(Vec::new()),
        )
        .await;
        assert!(matches!(
            result,
            Err(ServerError::Config(ConfigError::EmptySource))
        ));
    }

    #[tokio::test]
    async fn serves_status_and_stops_on_request() {
        let server = MockServer::bind(
            localhost(),
            StreamConfig::default(),
            StreamSource::dummy_mp3(8192),
        )
        .await
        .unwrap();
        let handle = server.spawn().unwrap();
        let addr = handle.local_addr();

        assert!(wait_for_ready(addr, Duration::from_secs(5)).await);

        let mut stream = get(addr, "GET /shutdown HTTP/1.1\r\n\r\n").await;
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        assert!(reply.ends_with(b"OK\n"));

        tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("server should stop after /shutdown");
    }

    #[tokio::test]
    async fn independent_listeners_receive_same_stream() {
        let source = StreamSource::dummy_mp3(20_000);
        let server = MockServer::bind(localhost(), StreamConfig::default(), source.clone())
            .await
            .unwrap();
        let handle = server.spawn().unwrap();
        let addr = handle.local_addr();

        let mut a = get(addr, "GET /stream HTTP/1.1\r\n\r\n").await;
        let mut b = get(addr, "GET /stream HTTP/1.1\r\n\r\n").await;

        let mut a_bytes = vec![0u8; 12_000];
        let mut b_bytes = vec![0u8; 12_000];
        let (ra, rb) = tokio::join!(a.read_exact(&mut a_bytes), b.read_exact(&mut b_bytes));
        ra.unwrap();
        rb.unwrap();
        assert_eq!(a_bytes, b_bytes);

        let body = &a_bytes[a_bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4..];
        assert_eq!(body, &source.as_bytes()[..body.len()]);

        handle.stop().await;
    }

    #[tokio::test]
    async fn stop_releases_client_that_never_sends_a_request() {
        let server = MockServer::bind(
            localhost(),
            StreamConfig::default(),
            StreamSource::dummy_mp3(8192),
        )
        .await
        .unwrap();
        let handle = server.spawn().unwrap();
        let addr = handle.local_addr();
        assert!(wait_for_ready(addr, Duration::from_secs(5)).await);

        let mut idle = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.stop().await;

        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(3), idle.read_to_end(&mut rest))
            .await
            .expect("idle connection should close after stop")
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn stop_ends_active_streams() {
        let server = MockServer::bind(
            localhost(),
            StreamConfig::default(),
            StreamSource::dummy_mp3(65_536),
        )
        .await
        .unwrap();
        let handle = server.spawn().unwrap();

        let mut stream = get(handle.local_addr(), "GET /stream HTTP/1.1\r\n\r\n").await;
        let mut first = vec![0u8; 1024];
        stream.read_exact(&mut first).await.unwrap();

        handle.stop().await;

        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
            .await
            .expect("stream should close after stop")
            .unwrap();
    }
}
