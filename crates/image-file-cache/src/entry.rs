//! Cache file naming

use crate::hash::string_hash;
use std::fmt;
use std::path::{Path, PathBuf};

/// Image file extensions kept as-is in cache file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageExtension {
    #[default]
    Jpg,
    Jpeg,
    Png,
    Gif,
}

impl ImageExtension {
    /// Resolve the extension of a URL.
    ///
    /// Takes whatever follows the last `.` up to the first `?` and matches it
    /// case-insensitively against the allow-list. Anything else is `Jpg`.
    pub fn from_url(url: &str) -> Self {
        let candidate = url
            .rsplit('.')
            .next()
            .and_then(|tail| tail.split('?').next())
            .unwrap_or_default();

        match candidate.to_ascii_lowercase().as_str() {
            "jpg" => Self::Jpg,
            "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            _ => Self::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    /// MIME type served for files with this extension
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a source URL lives in the cache directory.
///
/// Derived purely from the URL; whether the file exists on disk is the only
/// record of the entry being cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub extension: ImageExtension,
    pub path: PathBuf,
}

impl CacheEntry {
    pub fn for_url(cache_dir: &Path, url: &str) -> Self {
        let key = string_hash(url);
        let extension = ImageExtension::from_url(url);
        let path = cache_dir.join(format!("{}.{}", key, extension));

        Self {
            key,
            extension,
            path,
        }
    }

    /// File name inside the cache directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.key, self.extension)
    }
}
