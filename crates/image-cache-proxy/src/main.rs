//! Image cache proxy
//!
//! Serves remotely hosted images through a local disk cache so repeat
//! requests skip the network, and falls back to the source URL whenever the
//! cache cannot help.

mod error;
mod server;
mod types;

use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::types::ProxyConfig;
use image_file_cache::{HttpDownloader, ImageCache};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("image_cache_proxy=info".parse()?)
        .add_directive("image_file_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting image cache proxy...");

    let config = load_config();
    info!("Port: {}", config.port);
    info!("Cache root: {:?}", config.cache_root);
    match config.download_timeout_secs {
        Some(secs) => info!("Download timeout: {} seconds", secs),
        None => info!("Download timeout: none"),
    }

    let downloader = match config.download_timeout_secs {
        Some(secs) => HttpDownloader::with_timeout(Duration::from_secs(secs))?,
        None => HttpDownloader::new(),
    };

    let cache = ImageCache::with_downloader(&config.cache_root, downloader);
    cache.init().await?;

    let state: SharedState = Arc::new(ServerState::new(cache, config.prefetch_concurrency));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

fn load_config() -> ProxyConfig {
    let defaults = ProxyConfig::default();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(defaults.port);

    let cache_root = std::env::var("CACHE_ROOT")
        .map(PathBuf::from)
        .unwrap_or(defaults.cache_root);

    let download_timeout_secs = std::env::var("DOWNLOAD_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0);

    let prefetch_concurrency = std::env::var("PREFETCH_CONCURRENCY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(defaults.prefetch_concurrency);

    ProxyConfig {
        port,
        cache_root,
        download_timeout_secs,
        prefetch_concurrency,
    }
}
