//! Cover resolver - picks a cover for a new album and materializes it.
//!
//! Resolution never touches the store; callers record the returned
//! [`MaterializedCover::stored_path`] on the album row.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};
use crate::metadata::TrackMetadata;

use super::ImageFormat;
use super::cache::CoverCache;
use super::sidecar::{SIDECAR_EXTENSIONS, find_sidecar_cover};

/// Where cover bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    /// An image file on disk; its extension names the format
    Path(PathBuf),
    /// Raw image bytes with a declared format
    Data { data: Vec<u8>, format: ImageFormat },
}

impl CoverSource {
    /// Raw bytes with a declared MIME type; only JPEG and PNG are accepted.
    pub fn from_bytes(data: Vec<u8>, mime: &str) -> Result<Self> {
        let format = ImageFormat::from_mime(mime)
            .ok_or_else(|| Error::cover(format!("unsupported image type {mime}")))?;
        Ok(Self::Data { data, format })
    }
}

/// A cover written into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedCover {
    /// The cached file
    pub cache_path: PathBuf,
    /// `cache_path` plus the cache-busting suffix, as stored on the album
    pub stored_path: String,
}

/// Resolves and materializes album covers.
#[derive(Debug, Clone)]
pub struct CoverResolver {
    cache: CoverCache,
}

impl CoverResolver {
    /// Create a resolver backed by a cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: CoverCache::new(cache_dir),
        }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &CoverCache {
        &self.cache
    }

    /// Resolve the cover of a freshly created album from its seeding track.
    ///
    /// The embedded picture wins over sidecar files. `album_dir` is `None` for
    /// albums without a real folder; those only take embedded pictures and get
    /// no in-folder copy. Returns `Ok(None)` when no source exists.
    pub async fn resolve(
        &self,
        album_id: i64,
        seed: &TrackMetadata,
        album_dir: Option<&Path>,
    ) -> Result<Option<MaterializedCover>> {
        let source = if let Some(picture) = &seed.picture {
            Some(CoverSource::Data {
                data: picture.data.clone(),
                format: picture.format,
            })
        } else if let Some(dir) = album_dir {
            find_sidecar_cover(dir, seed.title.as_deref())
                .await
                .map(CoverSource::Path)
        } else {
            None
        };

        match source {
            Some(source) => self.materialize(album_id, source, album_dir).await.map(Some),
            None => Ok(None),
        }
    }

    /// Write a cover into the cache and, best-effort, into the album folder.
    pub async fn materialize(
        &self,
        album_id: i64,
        source: CoverSource,
        album_dir: Option<&Path>,
    ) -> Result<MaterializedCover> {
        let (extension, data, origin) = match source {
            CoverSource::Path(path) => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .filter(|ext| SIDECAR_EXTENSIONS.contains(&ext.as_str()))
                    .ok_or_else(|| {
                        Error::cover(format!("{} is not a supported image", path.display()))
                    })?;
                let data = tokio::fs::read(&path)
                    .await
                    .with_context(format!("reading cover {}", path.display()))?;
                (extension, data, Some(path))
            }
            CoverSource::Data { data, format } => (format.extension().to_string(), data, None),
        };

        let cache_path = self
            .cache
            .put(album_id, &extension, &data)
            .await
            .with_context(format!("caching cover for album {album_id}"))?;

        if let Some(dir) = album_dir {
            copy_into_album_dir(dir, &extension, &data, origin.as_deref()).await;
        }

        tracing::debug!(
            target: "musicly::library::cover",
            album_id,
            path = %cache_path.display(),
            "Cover materialized"
        );

        Ok(MaterializedCover {
            stored_path: CoverCache::stamp(&cache_path),
            cache_path,
        })
    }
}

/// Write `cover.<ext>` next to the music. Failures are logged, never returned.
async fn copy_into_album_dir(dir: &Path, extension: &str, data: &[u8], origin: Option<&Path>) {
    let target = dir.join(format!("cover.{extension}"));

    if let Some(origin) = origin
        && same_file(origin, &target).await
    {
        return;
    }

    if let Err(e) = tokio::fs::write(&target, data).await {
        tracing::warn!(
            target: "musicly::library::cover",
            path = %target.display(),
            error = %e,
            "Could not write cover into album folder"
        );
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EmbeddedPicture;
    use tempfile::TempDir;

    fn seed_with_picture() -> TrackMetadata {
        TrackMetadata {
            title: Some("Song".to_string()),
            album: Some("Foo".to_string()),
            picture: Some(EmbeddedPicture {
                data: b"embedded jpeg".to_vec(),
                format: ImageFormat::Jpeg,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_embedded_picture_wins_over_sidecar() {
        let temp = TempDir::new().unwrap();
        let album_dir = temp.path().join("album");
        std::fs::create_dir(&album_dir).unwrap();
        std::fs::write(album_dir.join("cover.png"), b"sidecar png").unwrap();

        let resolver = CoverResolver::new(temp.path().join("cache"));
        let cover = resolver
            .resolve(4, &seed_with_picture(), Some(&album_dir))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cover.cache_path, temp.path().join("cache").join("4.jpg"));
        assert_eq!(std::fs::read(&cover.cache_path).unwrap(), b"embedded jpeg");
        assert!(cover.stored_path.starts_with(&cover.cache_path.display().to_string()));
        assert!(cover.stored_path.contains("?t="));
        // In-folder copy written alongside the existing sidecar
        assert_eq!(std::fs::read(album_dir.join("cover.jpg")).unwrap(), b"embedded jpeg");
    }

    #[tokio::test]
    async fn test_sidecar_used_without_embedded_picture() {
        let temp = TempDir::new().unwrap();
        let album_dir = temp.path().join("album");
        std::fs::create_dir(&album_dir).unwrap();
        std::fs::write(album_dir.join("cover.png"), b"sidecar png").unwrap();

        let resolver = CoverResolver::new(temp.path().join("cache"));
        let seed = TrackMetadata::default();
        let cover = resolver
            .resolve(9, &seed, Some(&album_dir))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(std::fs::read(&cover.cache_path).unwrap(), b"sidecar png");
        // The sidecar itself is left intact
        assert_eq!(std::fs::read(album_dir.join("cover.png")).unwrap(), b"sidecar png");
    }

    #[tokio::test]
    async fn test_no_source_leaves_cover_unset() {
        let temp = TempDir::new().unwrap();
        let resolver = CoverResolver::new(temp.path().join("cache"));

        let result = resolver
            .resolve(1, &TrackMetadata::default(), Some(temp.path()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_folderless_album_skips_sidecar_and_copy() {
        let temp = TempDir::new().unwrap();
        let resolver = CoverResolver::new(temp.path().join("cache"));

        assert!(
            resolver
                .resolve(1, &TrackMetadata::default(), None)
                .await
                .unwrap()
                .is_none()
        );

        let cover = resolver
            .resolve(2, &seed_with_picture(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(cover.cache_path.exists());
    }

    #[tokio::test]
    async fn test_materialize_from_path_keeps_extension() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("scan.JPEG");
        std::fs::write(&image, b"jpeg").unwrap();
        let album_dir = temp.path().join("album");
        std::fs::create_dir(&album_dir).unwrap();

        let resolver = CoverResolver::new(temp.path().join("cache"));
        let cover = resolver
            .materialize(5, CoverSource::Path(image), Some(&album_dir))
            .await
            .unwrap();

        assert_eq!(cover.cache_path, temp.path().join("cache").join("5.jpeg"));
        assert!(album_dir.join("cover.jpeg").exists());
    }

    #[tokio::test]
    async fn test_materialize_rejects_unknown_image_extension() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("cover.gif");
        std::fs::write(&image, b"gif").unwrap();

        let resolver = CoverResolver::new(temp.path().join("cache"));
        let result = resolver.materialize(5, CoverSource::Path(image), None).await;
        assert!(matches!(result, Err(Error::Cover(_))));
    }

    #[test]
    fn test_source_from_bytes_checks_mime() {
        assert_eq!(
            CoverSource::from_bytes(vec![1], "image/png").unwrap(),
            CoverSource::Data {
                data: vec![1],
                format: ImageFormat::Png
            }
        );
        assert!(CoverSource::from_bytes(vec![1], "image/webp").is_err());
    }

    #[tokio::test]
    async fn test_materialize_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let resolver = CoverResolver::new(temp.path().join("cache"));

        let result = resolver
            .materialize(5, CoverSource::Path(temp.path().join("nope.png")), None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unwritable_album_dir_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let resolver = CoverResolver::new(temp.path().join("cache"));
        let missing_dir = temp.path().join("does-not-exist");

        let cover = resolver
            .resolve(3, &seed_with_picture(), Some(&missing_dir))
            .await
            .unwrap();
        assert!(cover.is_some());
    }
}
