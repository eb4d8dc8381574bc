//! Server lifecycle: stopping a running emulator and waiting for it to come up.
//!
//! Test harnesses typically spawn a [`MockServer`](crate::MockServer), call
//! [`wait_for_ready`], point the client under test at it, and finally call
//! [`ServerHandle::stop`].

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::protocol_constants::READY_POLL_INTERVAL_MS;

/// Handle to a server running on a background task.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        shutdown: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            local_addr,
            shutdown,
            task,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signals shutdown and waits for the accept loop to exit.
    ///
    /// Active sessions observe the same signal and end on their next
    /// iteration.
    pub async fn stop(self) {
        tracing::info!("Shutdown requested");
        self.shutdown.cancel();
        self.wait().await;
    }

    /// Waits until the server stops, e.g. after a `/shutdown` request.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            log::error!("[Server] Accept loop task failed: {}", e);
        }
    }
}

/// Polls `/status` until the server answers `200` or `timeout` elapses.
pub async fn wait_for_ready(addr: SocketAddr, timeout: Duration) -> bool {
    let probe = async {
        loop {
            if probe_status(addr).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(READY_POLL_INTERVAL_MS)).await;
        }
    };
    tokio::time::timeout(timeout, probe).await.is_ok()
}

async fn probe_status(addr: SocketAddr) -> bool {
    let attempt = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream
            .write_all(b"GET /status HTTP/1.0\r\nHost: localhost\r\n\r\n")
            .await?;
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;
        Ok::<_, std::io::Error>(reply)
    };

    match tokio::time::timeout(Duration::from_secs(1), attempt).await {
        Ok(Ok(reply)) => reply.starts_with(b"HTTP/1.0 200"),
        Ok(Err(e)) => {
            log::trace!("[Server] Readiness probe to {} failed: {}", addr, e);
            false
        }
        Err(_) => false,
    }
}
