//! Directory walker.
//!
//! Walks a tree and hands every regular file to a [`FileVisitor`]. At each
//! level the children are stat'ed concurrently, then subdirectories are walked
//! concurrently with the current directory's file batch. Files within one
//! batch are visited one at a time in listing order.
//!
//! Nothing is spawned: every child future is joined by its parent, so
//! [`Walker::walk`] only returns once the whole tree has been visited.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Supported audio file extensions (matched case-insensitively).
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "opus", "ogg", "aac", "m4a", "wav"];

/// Whether a path carries a supported audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// What a path on disk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Other,
}

/// Classify a path, following symlinks.
pub async fn classify(path: &Path) -> Result<PathKind> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(kind_of(&meta)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::not_found(path)),
        Err(e) => Err(e.into()),
    }
}

fn kind_of(meta: &std::fs::Metadata) -> PathKind {
    if meta.is_dir() {
        PathKind::Directory
    } else if meta.is_file() {
        PathKind::File
    } else {
        PathKind::Other
    }
}

/// Receives the files found by a [`Walker`].
#[async_trait]
pub trait FileVisitor: Send + Sync {
    /// Handle one file.
    ///
    /// A non-fatal error only affects this file. A fatal one
    /// ([`Error::is_fatal`]) cancels the walk.
    async fn visit(&self, path: &Path) -> Result<()>;

    /// Called after `visit` failed with a non-fatal error.
    fn failed(&self, _path: &Path, _error: &Error) {}
}

/// Concurrent, cancellable directory walker.
pub struct Walker<'a> {
    visitor: &'a dyn FileVisitor,
    cancel: CancellationToken,
    follow_symlinks: bool,
    visited: Mutex<HashSet<PathBuf>>,
    fatal: Mutex<Option<Error>>,
}

impl<'a> Walker<'a> {
    /// Create a walker that reports to `visitor` and stops when `cancel` fires.
    pub fn new(visitor: &'a dyn FileVisitor, cancel: CancellationToken) -> Self {
        Self {
            visitor,
            cancel,
            follow_symlinks: true,
            visited: Mutex::new(HashSet::new()),
            fatal: Mutex::new(None),
        }
    }

    /// Whether symlinked files and directories are descended into.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Walk `root` to completion, or until cancelled.
    ///
    /// Returns the first fatal visitor error, if any.
    pub async fn walk(self, root: &Path) -> Result<()> {
        self.walk_dir(root.to_path_buf()).await;
        match self.fatal.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn walk_dir(&self, dir: PathBuf) -> BoxFuture<'_, ()> {
        async move {
            if self.cancel.is_cancelled() || !self.enter(&dir).await {
                return;
            }

            let children = match list_children(&dir).await {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(
                        target: "musicly::library::scan",
                        path = %dir.display(),
                        error = %e,
                        "Failed to read directory"
                    );
                    return;
                }
            };

            let kinds = join_all(children.iter().map(|child| self.stat(child))).await;

            let mut files = Vec::new();
            let mut subdirs = Vec::new();
            for (child, kind) in children.into_iter().zip(kinds) {
                match kind {
                    Some(PathKind::File) => files.push(child),
                    Some(PathKind::Directory) => subdirs.push(child),
                    _ => {}
                }
            }

            let subtrees = join_all(subdirs.into_iter().map(|d| self.walk_dir(d)));
            futures::join!(subtrees, self.visit_files(files));
        }
        .boxed()
    }

    /// Record a directory as visited. False if it was seen before.
    async fn enter(&self, dir: &Path) -> bool {
        let key = tokio::fs::canonicalize(dir)
            .await
            .unwrap_or_else(|_| dir.to_path_buf());
        let fresh = self.visited.lock().insert(key);
        if !fresh {
            tracing::debug!(target: "musicly::library::scan", path = %dir.display(), "Directory already visited");
        }
        fresh
    }

    async fn stat(&self, path: &Path) -> Option<PathKind> {
        let meta = if self.follow_symlinks {
            tokio::fs::metadata(path).await
        } else {
            tokio::fs::symlink_metadata(path).await
        };
        match meta {
            Ok(meta) => Some(kind_of(&meta)),
            Err(e) => {
                tracing::debug!(target: "musicly::library::scan", path = %path.display(), error = %e, "Failed to stat");
                None
            }
        }
    }

    async fn visit_files(&self, files: Vec<PathBuf>) {
        for file in files {
            if self.cancel.is_cancelled() {
                return;
            }
            match self.visitor.visit(&file).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!(
                        target: "musicly::library::scan",
                        path = %file.display(),
                        error = %e,
                        "Store unavailable, stopping scan"
                    );
                    self.fatal.lock().get_or_insert(e);
                    self.cancel.cancel();
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        target: "musicly::library::scan",
                        path = %file.display(),
                        error = %e,
                        "Failed to ingest file"
                    );
                    self.visitor.failed(&file, &e);
                }
            }
        }
    }
}

/// Children of a directory, sorted by name.
async fn list_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<PathBuf>>,
        failed: Mutex<Vec<PathBuf>>,
        fail_on: Option<&'static str>,
        fatal_on: Option<&'static str>,
    }

    impl Collector {
        fn names(&self) -> Vec<String> {
            self.seen
                .lock()
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl FileVisitor for Collector {
        async fn visit(&self, path: &Path) -> Result<()> {
            self.seen.lock().push(path.to_path_buf());
            let name = path.file_name().and_then(|n| n.to_str());
            if name.is_some() && name == self.fail_on {
                return Err(Error::metadata(path, "bad tag"));
            }
            if name.is_some() && name == self.fatal_on {
                return Err(Error::Database(sqlx::Error::PoolClosed));
            }
            Ok(())
        }

        fn failed(&self, path: &Path, _error: &Error) {
            self.failed.lock().push(path.to_path_buf());
        }
    }

    #[test]
    fn test_audio_extensions() {
        assert!(is_audio_file(Path::new("/a/song.mp3")));
        assert!(is_audio_file(Path::new("/a/UPPER.FLAC")));
        assert!(is_audio_file(Path::new("/a/x.opus")));
        assert!(!is_audio_file(Path::new("/a/cover.png")));
        assert!(!is_audio_file(Path::new("/a/noext")));
    }

    #[tokio::test]
    async fn test_classify() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.mp3");
        File::create(&file).unwrap();

        assert_eq!(classify(dir.path()).await.unwrap(), PathKind::Directory);
        assert_eq!(classify(&file).await.unwrap(), PathKind::File);
        assert!(matches!(
            classify(&dir.path().join("missing")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_walk_visits_every_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        File::create(root.join("song.mp3")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        let sub = root.join("sub").join("deeper");
        std::fs::create_dir_all(&sub).unwrap();
        File::create(sub.join("track.flac")).unwrap();
        std::fs::create_dir(root.join("empty")).unwrap();

        let collector = Collector::default();
        Walker::new(&collector, CancellationToken::new())
            .walk(root)
            .await
            .unwrap();

        let mut names = collector.names();
        names.sort();
        assert_eq!(names, vec!["notes.txt", "song.mp3", "track.flac"]);
    }

    #[tokio::test]
    async fn test_files_visited_in_listing_order() {
        let dir = tempdir().unwrap();
        for name in ["c.mp3", "a.mp3", "b.mp3"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let collector = Collector::default();
        Walker::new(&collector, CancellationToken::new())
            .walk(dir.path())
            .await
            .unwrap();

        assert_eq!(collector.names(), vec!["a.mp3", "b.mp3", "c.mp3"]);
    }

    #[tokio::test]
    async fn test_file_error_is_isolated() {
        let dir = tempdir().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let collector = Collector {
            fail_on: Some("b.mp3"),
            ..Default::default()
        };
        Walker::new(&collector, CancellationToken::new())
            .walk(dir.path())
            .await
            .unwrap();

        assert_eq!(collector.names().len(), 3);
        assert_eq!(*collector.failed.lock(), vec![dir.path().join("b.mp3")]);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_walk() {
        let dir = tempdir().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let collector = Collector {
            fatal_on: Some("b.mp3"),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let result = Walker::new(&collector, cancel.clone()).walk(dir.path()).await;

        assert!(result.unwrap_err().is_fatal());
        assert!(cancel.is_cancelled());
        assert_eq!(collector.names(), vec!["a.mp3", "b.mp3"]);
        assert!(collector.failed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_walk_visits_nothing() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.mp3")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let collector = Collector::default();
        Walker::new(&collector, cancel).walk(dir.path()).await.unwrap();

        assert!(collector.names().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_loop_terminates() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        File::create(sub.join("a.mp3")).unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();

        let collector = Collector::default();
        Walker::new(&collector, CancellationToken::new())
            .walk(dir.path())
            .await
            .unwrap();

        assert_eq!(collector.names(), vec!["a.mp3"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_ignored_when_not_followed() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        File::create(real.join("a.mp3")).unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&real, root.join("link")).unwrap();

        let collector = Collector::default();
        Walker::new(&collector, CancellationToken::new())
            .follow_symlinks(false)
            .walk(&root)
            .await
            .unwrap();

        assert!(collector.names().is_empty());
    }
}
