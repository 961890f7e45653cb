//! Core types for the image cache proxy

use image_file_cache::CacheStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the image cache proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    /// Platform cache root; images live in `<cache_root>/image-cache`
    pub cache_root: PathBuf,
    pub download_timeout_secs: Option<u64>,
    pub prefetch_concurrency: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3002,
            cache_root: PathBuf::from("./cache"),
            download_timeout_secs: None,
            prefetch_concurrency: 4,
        }
    }
}

/// Query string carrying the source image URL
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct PrefetchRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PrefetchResponse {
    pub requested: usize,
    pub cached: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}
