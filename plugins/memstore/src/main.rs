mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use spanbridge::{PluginServer, StoragePlugin};
use store::MemStore;

const PLUGIN_NAME: &str = "storage/memstore";
const PLUGIN_VERSION: &str = "0.1.0";

const DEFAULT_LISTEN: &str = "127.0.0.1:4317";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spanbridge_memstore=info".parse()?)
                .add_directive("spanbridge=info".parse()?),
        )
        .with_target(false)
        .without_time()
        .init();

    tracing::info!("Starting {PLUGIN_NAME} v{PLUGIN_VERSION}");

    // The process supervisor exchanges this address with the host
    // out-of-band; it can override the default via argv or env.
    let listen = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SPANBRIDGE_MEMSTORE_LISTEN").ok())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;

    let store = Arc::new(MemStore::new());
    // Streaming writer is deliberately left unbound: hosts discover
    // that through capability negotiation, not through failed calls.
    let plugin = StoragePlugin::builder()
        .span_reader(store.clone())
        .span_writer(store.clone())
        .archive_reader(store.clone())
        .archive_writer(store)
        .build()
        .context("plugin binding validation failed")?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal.cancel();
        }
    });

    PluginServer::new(plugin)
        .serve(addr, shutdown)
        .await
        .context("plugin server failed")?;

    tracing::info!("Plugin stopped");
    Ok(())
}
