//! File-based image cache keyed by source URL

use crate::downloader::{is_temp_file, Downloader, HttpDownloader};
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::types::{CacheStats, CachedImage};
use futures::stream::{self, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

/// Name of the flat directory created under the cache root
pub const CACHE_DIR_NAME: &str = "image-cache";

/// An image cache backed by one flat directory of `<hash>.<ext>` files.
///
/// There is no index: a file existing at the derived path is what makes a URL
/// cached. Requests for the same URL are not de-duplicated, so two concurrent
/// misses both download and the last one to land wins. The bytes are the same
/// for a given URL, so this race is left unsynchronized on purpose.
pub struct ImageCache {
    /// Directory where cached images are stored
    cache_dir: PathBuf,
    downloader: Arc<dyn Downloader>,
    hits: AtomicU64,
    misses: AtomicU64,
    downloads: AtomicU64,
    fallbacks: AtomicU64,
}

impl ImageCache {
    /// Create a cache under `root` that downloads over HTTP
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_downloader(root, HttpDownloader::new())
    }

    /// Create a cache under `root` with a custom downloader
    pub fn with_downloader(root: impl AsRef<Path>, downloader: impl Downloader + 'static) -> Self {
        Self {
            cache_dir: root.as_ref().join(CACHE_DIR_NAME),
            downloader: Arc::new(downloader),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Ensure the cache directory exists. Safe to call repeatedly.
    pub async fn init(&self) -> Result<()> {
        if fs::try_exists(&self.cache_dir).await.unwrap_or(false) {
            return Ok(());
        }

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::CreateDir(self.cache_dir.clone(), e))?;
        info!(cache_dir = ?self.cache_dir, "Image cache directory created");
        Ok(())
    }

    /// Derive where `url` is stored. No I/O.
    pub fn entry_for(&self, url: &str) -> CacheEntry {
        CacheEntry::for_url(&self.cache_dir, url)
    }

    /// Return the local path for `url` if it is already cached.
    ///
    /// A failure to create the cache directory propagates; a failed existence
    /// check is logged and reported as a miss.
    pub async fn lookup(&self, url: &str) -> Result<Option<PathBuf>> {
        self.init().await?;
        let entry = self.entry_for(url);

        match fs::try_exists(&entry.path).await {
            Ok(true) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %entry.key, "Cache hit");
                Ok(Some(entry.path))
            }
            Ok(false) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %entry.key, "Cache miss");
                Ok(None)
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key = %entry.key, error = %e, "Failed to check cached file, treating as miss");
                Ok(None)
            }
        }
    }

    /// Download `url` into the cache and return the local path
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        self.init().await?;
        let entry = self.entry_for(url);

        self.downloader.download(url, &entry.path).await?;
        self.downloads.fetch_add(1, Ordering::Relaxed);
        debug!(key = %entry.key, url = %url, "Cached image");

        Ok(entry.path)
    }

    /// Return a local copy of `url`, downloading it on a miss
    pub async fn fetch(&self, url: &str) -> Result<CachedImage> {
        let extension = self.entry_for(url).extension;

        if let Some(path) = self.lookup(url).await? {
            return Ok(CachedImage {
                path,
                extension,
                from_cache: true,
            });
        }

        let path = self.download(url).await?;
        Ok(CachedImage {
            path,
            extension,
            from_cache: false,
        })
    }

    /// Resolve `url` to something displayable.
    ///
    /// Returns a local `file://` URI when the image is (or can be) cached and
    /// the original URL on any failure. Empty input resolves to an empty
    /// string without touching the filesystem or network.
    pub async fn resolve<'a>(&self, url: impl Into<Option<&'a str>>) -> String {
        let url = match url.into() {
            Some(url) if !url.is_empty() => url,
            _ => return String::new(),
        };

        match self.fetch(url).await {
            Ok(image) => local_uri(&image.path),
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                match &e {
                    CacheError::CreateDir(..) => {
                        warn!(url = %url, error = %e, "Cache directory unavailable, serving original URL")
                    }
                    CacheError::Io(_)
                    | CacheError::Http(_)
                    | CacheError::Status(_)
                    | CacheError::Download(_) => {
                        warn!(url = %url, error = %e, "Failed to cache image, serving original URL")
                    }
                }
                url.to_string()
            }
        }
    }

    /// Remove the cached copy of `url`, if any. Failures are logged.
    pub async fn invalidate(&self, url: &str) {
        let entry = self.entry_for(url);
        match remove_file_if_present(&entry.path).await {
            Ok(true) => debug!(key = %entry.key, "Invalidated cache entry"),
            Ok(false) => {}
            Err(e) => warn!(key = %entry.key, error = %e, "Failed to invalidate cache entry"),
        }
    }

    /// Delete every cached image and recreate the empty directory.
    /// Failures are logged.
    pub async fn clear(&self) {
        if let Err(e) = self.try_clear().await {
            warn!(cache_dir = ?self.cache_dir, error = %e, "Failed to clear image cache");
        }
    }

    async fn try_clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.cache_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::CreateDir(self.cache_dir.clone(), e))?;
        info!(cache_dir = ?self.cache_dir, "Image cache cleared");
        Ok(())
    }

    /// Warm the cache for `urls`, running at most `concurrency` downloads at
    /// once. Returns how many of the URLs are now served locally.
    pub async fn prefetch<I, S>(&self, urls: I, concurrency: usize) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.as_ref().to_string())
            .filter(|u| !u.is_empty())
            .collect();

        let requested = urls.len();
        let results: Vec<bool> = stream::iter(urls)
            .map(|url| async move {
                match self.fetch(&url).await {
                    Ok(_) => true,
                    Err(e) => {
                        self.fallbacks.fetch_add(1, Ordering::Relaxed);
                        warn!(url = %url, error = %e, "Prefetch failed");
                        false
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let cached = results.into_iter().filter(|ok| *ok).count();
        debug!(requested, cached, "Prefetch finished");
        cached
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let (entries, total_size) = match self.scan().await {
            Ok(totals) => totals,
            Err(e) => {
                warn!(cache_dir = ?self.cache_dir, error = %e, "Failed to scan image cache");
                (0, 0)
            }
        };

        CacheStats {
            entries,
            total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    async fn scan(&self) -> Result<(usize, u64)> {
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => return Err(e.into()),
        };

        let mut entries = 0;
        let mut total_size = 0;
        while let Some(item) = dir.next_entry().await? {
            if is_temp_file(&item.file_name().to_string_lossy()) {
                continue;
            }
            let metadata = item.metadata().await?;
            if metadata.is_file() {
                entries += 1;
                total_size += metadata.len();
            }
        }
        Ok((entries, total_size))
    }
}

/// Delete `path`, reporting whether anything was there
async fn remove_file_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn local_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|_| path.display().to_string())
}
