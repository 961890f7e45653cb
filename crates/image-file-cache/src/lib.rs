//! Disk-backed image cache
//!
//! Memoizes remotely fetched images in a flat local directory, naming each
//! file after a hash of its source URL. The cache is an optimization layer
//! only: the public entry point never fails and falls back to the original
//! URL whenever anything goes wrong.

mod cache;
mod downloader;
mod entry;
mod error;
mod hash;
mod types;

pub use cache::{ImageCache, CACHE_DIR_NAME};
pub use downloader::{Downloader, HttpDownloader};
pub use entry::{CacheEntry, ImageExtension};
pub use error::{CacheError, Result};
pub use hash::string_hash;
pub use types::{CacheStats, CachedImage};
