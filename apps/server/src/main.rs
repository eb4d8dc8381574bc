//! icemock server - standalone Icecast/Shoutcast emulator.
//!
//! Serves a looping fixture stream with ICY metadata so that streaming
//! clients can be tested without a real radio server. `GET /shutdown`
//! stops it remotely; Ctrl+C or SIGTERM stop it locally.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use icemock_core::{MockServer, StreamSource};
use tokio::signal;

use crate::config::ServerConfig;

/// icemock - Mock Icecast/Shoutcast server for testing.
#[derive(Parser, Debug)]
#[command(name = "icemock-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "ICEMOCK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Port to listen on (overrides config file).
    #[arg(short, long, env = "ICEMOCK_PORT")]
    port: Option<u16>,

    /// Path to stream fixture file.
    #[arg(short, long, value_name = "FILE")]
    stream: Option<PathBuf>,

    /// ICY metadata interval in bytes.
    #[arg(short, long, env = "ICEMOCK_META_INTERVAL")]
    meta_interval: Option<usize>,

    /// Station name for ICY headers.
    #[arg(long)]
    station_name: Option<String>,

    /// Station URL for ICY headers.
    #[arg(long)]
    station_url: Option<String>,

    /// Reported bitrate (kbit/s).
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// MIME content type.
    #[arg(long)]
    content_type: Option<String>,

    /// Drop `/drop` connections after N bytes (for reconnect testing).
    #[arg(long, env = "ICEMOCK_DROP_AFTER")]
    drop_after: Option<u64>,

    /// Metadata strings to cycle through.
    #[arg(long, num_args = 0..)]
    metadata: Option<Vec<String>>,
}

impl Args {
    /// Applies command-line overrides on top of file and environment values.
    fn apply_to(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(stream) = self.stream {
            config.stream_file = Some(stream);
        }
        if let Some(interval) = self.meta_interval {
            config.meta_interval = interval;
        }
        if let Some(name) = self.station_name {
            config.station_name = name;
        }
        if let Some(url) = self.station_url {
            config.station_url = url;
        }
        if let Some(bitrate) = self.bitrate {
            config.bitrate = bitrate;
        }
        if let Some(content_type) = self.content_type {
            config.content_type = content_type;
        }
        if let Some(bytes) = self.drop_after {
            config.drop_after_bytes = bytes;
        }
        if let Some(metadata) = self.metadata {
            config.metadata = metadata;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("icemock server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration, then apply CLI overrides
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    let stream_config = config
        .to_stream_config()
        .context("Invalid stream configuration")?;
    let source = StreamSource::load(config.stream_file.as_deref())
        .context("Failed to load stream source")?;

    log::info!(
        "Configuration: port={}, meta_interval={}, drop_after={}, titles={}, source_bytes={}",
        config.port,
        stream_config.meta_interval,
        stream_config.drop_after_bytes,
        stream_config.metadata.len(),
        source.len()
    );

    let addr = SocketAddr::new(config.bind_address, config.port);
    let server = MockServer::bind(addr, stream_config, source)
        .await
        .with_context(|| format!("Failed to start server on {}", addr))?;
    let handle = server.spawn().context("Failed to start server")?;
    let shutdown = handle.shutdown_token();

    log::info!("Mock streaming server running on {}", handle.local_addr());
    log::info!("Press Ctrl+C or GET /shutdown to stop");

    // Wait for either an OS signal or a remote /shutdown request
    tokio::select! {
        _ = shutdown_signal() => log::info!("Shutdown signal received, cleaning up..."),
        _ = shutdown.cancelled() => log::info!("Remote shutdown requested, cleaning up..."),
    }

    handle.stop().await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_values() {
        let args = Args::try_parse_from([
            "icemock-server",
            "--port",
            "9100",
            "--drop-after",
            "5000",
            "--metadata",
            "One",
            "Two",
            "Three",
        ])
        .unwrap();

        let mut config = ServerConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.port, 9100);
        assert_eq!(config.drop_after_bytes, 5000);
        assert_eq!(config.metadata, ["One", "Two", "Three"]);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let args = Args::try_parse_from(["icemock-server", "-m", "1024"]).unwrap();
        let mut config = ServerConfig {
            station_name: "From File".into(),
            ..Default::default()
        };
        args.apply_to(&mut config);

        assert_eq!(config.meta_interval, 1024);
        assert_eq!(config.station_name, "From File");
    }
}
