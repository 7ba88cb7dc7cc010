//! bigfs server entry point.

mod config;

use std::sync::Arc;

use anyhow::Context;
use bigfs_server::{FileServer, FileService, ServerConfig};
use bigfs_store::{FileStore, StoreConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigfs server");

    let path = config::config_path(std::env::args().nth(1));
    let mut settings = config::ServerSettings::load_from(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    settings.apply_overrides(|key| std::env::var(key).ok())?;
    tracing::info!(
        config = %path.display(),
        shared_dir = %settings.shared_dir.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

async fn run(settings: config::ServerSettings) -> anyhow::Result<()> {
    let store = FileStore::open(&StoreConfig {
        root: settings.shared_dir.clone(),
    })
    .with_context(|| format!("opening shared directory {}", settings.shared_dir.display()))?;

    let server = FileServer::new(
        ServerConfig {
            bind_addr: settings.bind_addr.clone(),
            port: settings.port,
        },
        FileService::new(Arc::new(store)),
    );

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            cancel.cancel();
        }
    });

    server.run().await?;
    Ok(())
}
