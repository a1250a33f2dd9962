//! Cover art disk cache.
//!
//! One file per album, keyed by album id: `<cache>/<album id>.<ext>`.

use std::fs;
use std::path::{Path, PathBuf};

/// Separator between a cached cover path and its cache-busting timestamp.
const CACHE_BUST_MARKER: &str = "?t=";

/// Strip the `?t=<millis>` suffix from a stored cover path.
pub fn strip_cache_suffix(stored: &str) -> &str {
    match stored.rfind(CACHE_BUST_MARKER) {
        Some(idx) => &stored[..idx],
        None => stored,
    }
}

/// Cover art disk cache.
#[derive(Debug, Clone)]
pub struct CoverCache {
    cache_dir: PathBuf,
}

impl CoverCache {
    /// Create a new cache in the specified directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        // Ensure cache directory exists
        let _ = fs::create_dir_all(&cache_dir);
        Self { cache_dir }
    }

    /// Directory holding the cached covers.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache path for an album's cover with the given extension.
    pub fn path_for(&self, album_id: i64, extension: &str) -> PathBuf {
        self.cache_dir.join(format!("{album_id}.{extension}"))
    }

    /// Store cover bytes for an album, replacing any previous file of the same extension.
    pub async fn put(
        &self,
        album_id: i64,
        extension: &str,
        data: &[u8],
    ) -> Result<PathBuf, std::io::Error> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let path = self.path_for(album_id, extension);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Stored path with a fresh cache-busting suffix.
    pub fn stamp(path: &Path) -> String {
        format!(
            "{}{}{}",
            path.display(),
            CACHE_BUST_MARKER,
            chrono::Utc::now().timestamp_millis()
        )
    }

    /// Remove a cached cover given its stored (possibly suffixed) path.
    ///
    /// Best-effort: a missing file is not an error worth reporting.
    pub async fn remove(&self, stored: &str) {
        let path = strip_cache_suffix(stored);
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(target: "musicly::library::cover", path, "Removed cached cover"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(target: "musicly::library::cover", path, error = %e, "Failed to remove cached cover")
            }
        }
    }

    /// Clear all cached covers.
    pub fn clear(&self) -> Result<(), std::io::Error> {
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_strip_cache_suffix() {
        assert_eq!(strip_cache_suffix("/c/12.png?t=1700000000000"), "/c/12.png");
        assert_eq!(strip_cache_suffix("/c/12.png"), "/c/12.png");
    }

    #[test]
    fn test_stamp_appends_timestamp() {
        let stamped = CoverCache::stamp(Path::new("/c/3.jpg"));
        assert!(stamped.starts_with("/c/3.jpg?t="));
        let millis: i64 = stamped.rsplit("?t=").next().unwrap().parse().unwrap();
        assert!(millis > 0);
    }

    #[tokio::test]
    async fn test_put_and_remove() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path().join("covers"));

        let path = cache.put(12, "png", b"fake png data").await.unwrap();
        assert_eq!(path, temp.path().join("covers").join("12.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake png data");

        cache.remove(&CoverCache::stamp(&path)).await;
        assert!(!path.exists());

        // Removing again is silent
        cache.remove(&path.display().to_string()).await;
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());

        let a = cache.put(1, "jpg", &[1, 2, 3]).await.unwrap();
        let b = cache.put(2, "png", &[4, 5, 6]).await.unwrap();

        cache.clear().unwrap();

        assert!(!a.exists());
        assert!(!b.exists());
    }
}
