//! Fetching remote images onto local storage

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Persists a remote resource to a local path.
///
/// Implementations must either leave a complete file at `destination` or
/// return an error.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Sequence for temporary file names within this process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// HTTP client for downloading images
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a downloader with reqwest defaults (no request timeout)
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create a downloader whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    async fn stream_to(&self, url: &str, temp_path: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(CacheError::Status(response.status()));
        }

        let mut file = fs::File::create(temp_path).await?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let temp_path = temp_path_for(destination);
        debug!(url = %url, path = ?destination, "Downloading image");

        // Concurrent downloads of the same URL each rename their own
        // temporary file; the last rename wins with identical bytes.
        let result = match self.stream_to(url, &temp_path).await {
            Ok(size) => fs::rename(&temp_path, destination)
                .await
                .map(|()| size)
                .map_err(CacheError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(size) => {
                debug!(url = %url, size, "Downloaded image");
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }
}

/// Unique sibling of `destination` that a partial download is written to
fn temp_path_for(destination: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}-{}.part", name, std::process::id(), seq))
}

/// Whether a directory entry is an in-flight download rather than a cached image
pub(crate) fn is_temp_file(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(".part")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tempfile::tempdir;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let dest = Path::new("/cache/image-cache/abc.png");
        let a = temp_path_for(dest);
        let b = temp_path_for(dest);

        assert_ne!(a, b);
        assert_eq!(a.parent(), dest.parent());
        assert!(is_temp_file(&a.file_name().unwrap().to_string_lossy()));
        assert!(!is_temp_file("abc.png"));
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let base = serve(Router::new().route("/hall.png", get(|| async { "PNGDATA" }))).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.png");

        HttpDownloader::new()
            .download(&format!("{}/hall.png", base), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"PNGDATA");
        // Only the final file remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let base = serve(Router::new().route(
            "/missing.png",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        ))
        .await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.png");

        let result = HttpDownloader::new()
            .download(&format!("{}/missing.png", base), &dest)
            .await;

        assert!(matches!(result, Err(CacheError::Status(s)) if s == StatusCode::NOT_FOUND));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let result = HttpDownloader::new()
            .download(&format!("http://{}/x.jpg", addr), &dest)
            .await;

        assert!(matches!(result, Err(CacheError::Http(_))));
        assert!(!dest.exists());
    }

    #[test]
    fn test_with_timeout_builds() {
        assert!(HttpDownloader::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
