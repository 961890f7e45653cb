//! Cache types

use crate::entry::ImageExtension;
use serde::Serialize;
use std::path::PathBuf;

/// A locally available image returned by [`crate::ImageCache::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub path: PathBuf,
    pub extension: ImageExtension,
    pub from_cache: bool,
}

/// Statistics about the cache
///
/// `entries` and `total_size` come from scanning the cache directory; the
/// counters cover the lifetime of one `ImageCache`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub downloads: u64,
    pub fallbacks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.downloads, 0);
        assert_eq!(stats.fallbacks, 0);
    }

    #[test]
    fn test_cache_stats_serialization() {
        let stats = CacheStats {
            entries: 3,
            total_size: 12345,
            hits: 7,
            misses: 3,
            downloads: 3,
            fallbacks: 1,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_size"], 12345);
        assert_eq!(json["fallbacks"], 1);
    }
}
