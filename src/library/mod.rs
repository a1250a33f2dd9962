//! The music library: ingestion, queries and edits over one store.
//!
//! [`Library`] owns the database pool and the cover resolver. Opening a path
//! walks it with [`crate::scanner::Walker`] and ingests every file:
//!
//! 1. Files without a supported audio extension are skipped silently.
//! 2. Paths already stored are left untouched.
//! 3. Tags are read and normalized. Files with no album tag all share one
//!    "Unknown album" / "Unknown artist" album whatever their folder.
//! 4. The album is resolved by (title, directory); the track that creates it
//!    also resolves its cover.
//! 5. The track row is inserted and each genre token attached to the album.

pub mod genre;
pub mod identity;
mod scan;

pub use scan::{Scan, ScanEvent, ScanReport};

use std::path::{Path, PathBuf};

use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::{Config, ScanConfig};
use crate::cover::{CoverResolver, CoverSource, MaterializedCover, strip_cache_suffix};
use crate::db::{self, DeletedAlbum, LibraryCounts, NewTrack};
use crate::error::{Error, Result, ResultExt};
use crate::metadata::{self, TagEdit, TrackMetadata};
use crate::model::{
    AlbumDetails, AlbumUpdate, LibraryView, Track, TrackUpdate, UNKNOWN_ALBUM,
    UNKNOWN_ALBUM_DIRECTORY, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};
use crate::scanner::{self, FileVisitor, PathKind, Walker};
use genre::{normalize_genre_list, split_genres};
use identity::{AlbumKey, resolve_album};
use scan::ScanVisitor;

/// Subfolder of the data directory holding cached covers.
pub const COVER_CACHE_DIR: &str = "covers";

/// Behaviour switches taken from the `[scan]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryOptions {
    /// Rewrite file tags after album/track edits
    pub write_tags: bool,
    /// Descend into symlinked directories
    pub follow_symlinks: bool,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            write_tags: true,
            follow_symlinks: true,
        }
    }
}

impl From<&ScanConfig> for LibraryOptions {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            write_tags: scan.write_tags,
            follow_symlinks: scan.follow_symlinks,
        }
    }
}

/// What ingesting one file did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new track row was stored
    Ingested {
        track_id: i64,
        album_id: i64,
        /// The track created its album
        new_album: bool,
    },
    /// The path was already in the library
    AlreadyPresent,
    /// Not a supported audio file
    Unsupported,
}

/// A music library backed by SQLite and a cover cache.
#[derive(Debug, Clone)]
pub struct Library {
    pool: SqlitePool,
    covers: CoverResolver,
    options: LibraryOptions,
    roots: Vec<PathBuf>,
}

impl Library {
    /// Open the library described by a config: its data directory, scan
    /// options and remembered roots.
    pub async fn open(config: &Config) -> Result<Self> {
        let mut library = Self::open_in(&config.data_dir(), (&config.scan).into()).await?;
        library.roots = config.library.paths.clone();
        Ok(library)
    }

    /// Open (creating if needed) the library stored in `data_dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory or database cannot be created, or migrations
    /// fail. The store is unusable in that case.
    pub async fn open_in(data_dir: &Path, options: LibraryOptions) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(format!("creating data directory {}", data_dir.display()))?;

        let db_path = data_dir.join(db::DEFAULT_DB_NAME);
        let pool = db::init_db(&db::db_url(Some(&db_path)))
            .await
            .with_context(format!("opening {}", db_path.display()))?;

        tracing::debug!(target: "musicly::store", path = %db_path.display(), "Library opened");

        Ok(Self {
            pool,
            covers: CoverResolver::new(data_dir.join(COVER_CACHE_DIR)),
            options,
            roots: Vec::new(),
        })
    }

    /// Replace the roots walked by [`Library::rescan`].
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Row counts of the store.
    pub async fn counts(&self) -> Result<LibraryCounts> {
        Ok(db::library_counts(&self.pool).await?)
    }

    /// Fail fast if the store cannot serve queries.
    async fn check_store(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .with_context("library store unavailable")?;
        Ok(())
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Ingest a file, or every file under a directory.
    pub async fn open_path(&self, path: &Path) -> Result<ScanReport> {
        self.open_path_with(path, &Scan::new()).await
    }

    /// [`Library::open_path`] with a caller-provided scan handle.
    ///
    /// Per-file failures are counted and reported as events; only a missing
    /// path or an unavailable store is returned as an error.
    pub async fn open_path_with(&self, path: &Path, scan: &Scan) -> Result<ScanReport> {
        self.check_store().await?;
        let visitor = ScanVisitor::new(self, scan);
        self.scan_into(path, scan, &visitor).await?;
        Ok(visitor.finish())
    }

    /// Walk every configured root again, picking up new files.
    pub async fn rescan(&self, scan: &Scan) -> Result<ScanReport> {
        self.check_store().await?;
        let visitor = ScanVisitor::new(self, scan);
        for root in &self.roots {
            if scan.is_cancelled() {
                break;
            }
            match self.scan_into(root, scan, &visitor).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(
                    target: "musicly::library::scan",
                    path = %root.display(),
                    error = %e,
                    "Skipping library root"
                ),
            }
        }
        Ok(visitor.finish())
    }

    async fn scan_into(&self, path: &Path, scan: &Scan, visitor: &ScanVisitor<'_>) -> Result<()> {
        let path = match tokio::fs::canonicalize(path).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::not_found(path)),
            Err(e) => return Err(e.into()),
        };
        match scanner::classify(&path).await? {
            PathKind::Directory => {
                tracing::info!(target: "musicly::library::scan", path = %path.display(), "Scanning directory");
                Walker::new(visitor, scan.token())
                    .follow_symlinks(self.options.follow_symlinks)
                    .walk(&path)
                    .await
            }
            PathKind::File => match visitor.visit(&path).await {
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(
                        target: "musicly::library::scan",
                        path = %path.display(),
                        error = %e,
                        "Failed to ingest file"
                    );
                    visitor.failed(&path, &e);
                    Ok(())
                }
                other => other,
            },
            PathKind::Other => {
                tracing::debug!(target: "musicly::library::scan", path = %path.display(), "Not a file or directory");
                Ok(())
            }
        }
    }

    /// Ingest one file. Idempotent: a stored path is never touched again.
    pub async fn ingest(&self, path: &Path) -> Result<IngestOutcome> {
        if !scanner::is_audio_file(path) {
            return Ok(IngestOutcome::Unsupported);
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::metadata(path, "path is not valid UTF-8"))?;

        if db::find_track_id_by_path(&self.pool, path_str).await?.is_some() {
            return Ok(IngestOutcome::AlreadyPresent);
        }

        let owned = path.to_path_buf();
        let meta = tokio::task::spawn_blocking(move || metadata::read(&owned)).await??;

        let album_dir = path.parent();
        let directory = album_dir.and_then(Path::to_str).unwrap_or(UNKNOWN_ALBUM_DIRECTORY);
        let key = match meta.album.as_deref() {
            Some(title) => AlbumKey {
                title,
                directory,
                artist: meta.album_artist.as_deref().unwrap_or(UNKNOWN_ARTIST),
                disc_count: meta.disc_total.map_or(1, i64::from),
            },
            None => AlbumKey {
                title: UNKNOWN_ALBUM,
                directory: UNKNOWN_ALBUM_DIRECTORY,
                artist: UNKNOWN_ARTIST,
                disc_count: 1,
            },
        };

        let album = resolve_album(&self.pool, &key).await?;
        if album.seeded {
            let cover_dir = meta.album.as_ref().and(album_dir);
            self.seed_cover(album.id, &meta, cover_dir).await?;
        }

        let track = NewTrack {
            title: meta.title.as_deref().unwrap_or(UNKNOWN_TITLE),
            composer: meta.composer.as_deref(),
            album_id: album.id,
            track_order: meta.track_number.map(i64::from),
            disc: meta.disc_number.map_or(1, i64::from),
            path: path_str,
        };
        let Some(track_id) = db::insert_track(&self.pool, &track).await? else {
            // Another task stored this path since the lookup
            return Ok(IngestOutcome::AlreadyPresent);
        };

        let mut conn = self.pool.acquire().await?;
        for raw in &meta.genres {
            for genre in split_genres(raw) {
                db::insert_genre(&mut conn, album.id, &genre).await?;
            }
        }

        tracing::debug!(
            target: "musicly::library::scan",
            path = path_str,
            track_id,
            album_id = album.id,
            "Track ingested"
        );

        Ok(IngestOutcome::Ingested {
            track_id,
            album_id: album.id,
            new_album: album.seeded,
        })
    }

    /// Resolve and record the cover of a freshly created album.
    ///
    /// Cover failures are logged; only store errors propagate.
    async fn seed_cover(&self, album_id: i64, seed: &TrackMetadata, dir: Option<&Path>) -> Result<()> {
        match self.covers.resolve(album_id, seed, dir).await {
            Ok(Some(cover)) => {
                db::set_album_cover(&self.pool, album_id, &cover.stored_path).await?;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(
                target: "musicly::library::cover",
                album_id,
                error = %e,
                "Failed to resolve album cover"
            ),
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Search the library. See [`db::search`].
    pub async fn get_library(&self, query: &str, genre: &str) -> Result<LibraryView> {
        Ok(db::search(&self.pool, query.trim(), genre.trim()).await?)
    }

    /// An album with its artist name and genres.
    pub async fn get_album(&self, album_id: i64) -> Result<AlbumDetails> {
        let album = db::get_album(&self.pool, album_id)
            .await?
            .ok_or(Error::AlbumNotFound(album_id))?;
        let artist = db::get_artist(&self.pool, album.artist_id)
            .await?
            .map(|a| a.name)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let genres = db::get_album_genres(&self.pool, album_id).await?;
        Ok(AlbumDetails {
            album,
            artist,
            genres,
        })
    }

    /// Tracks of an album, by disc then position.
    pub async fn get_album_tracks(&self, album_id: i64) -> Result<Vec<Track>> {
        Ok(db::get_album_tracks(&self.pool, album_id).await?)
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Delete an album, its tracks and genres, its artist if orphaned, and its
    /// cached cover.
    pub async fn delete_album(&self, album_id: i64) -> Result<DeletedAlbum> {
        let album = db::get_album(&self.pool, album_id)
            .await?
            .ok_or(Error::AlbumNotFound(album_id))?;

        let deleted = db::delete_album(&self.pool, &album).await?;

        if let Some(cover) = &album.cover_path {
            self.covers.cache().remove(cover).await;
        }

        tracing::info!(
            target: "musicly::store",
            album_id,
            tracks = deleted.tracks,
            artist_removed = deleted.artist_removed,
            "Album deleted"
        );
        Ok(deleted)
    }

    /// Rewrite an album's title, artist and genres, then (best-effort) the
    /// tags of its files.
    ///
    /// `update.tracks` names the files to retag; when empty, every stored
    /// track of the album is retagged.
    pub async fn update_album_info(&self, album_id: i64, update: &AlbumUpdate) -> Result<()> {
        let title = update.title.trim();
        let artist = update.artist.trim();
        if title.is_empty() || artist.is_empty() {
            return Err(Error::invalid("album title and artist must not be empty"));
        }

        let album = db::get_album(&self.pool, album_id)
            .await?
            .ok_or(Error::AlbumNotFound(album_id))?;
        let genres = normalize_genre_list(&update.genres);

        match db::update_album(&self.pool, &album, title, artist, &genres).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(Error::invalid("an album with this title already exists in its directory"));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(target: "musicly::store", album_id, title, artist, "Album updated");

        if self.options.write_tags {
            let files = if update.tracks.is_empty() {
                db::get_album_tracks(&self.pool, album_id)
                    .await?
                    .iter()
                    .map(Track::path_buf)
                    .collect()
            } else {
                update.tracks.clone()
            };
            let edit = TagEdit::album(title, artist, &genres);
            for file in files {
                write_tags_best_effort(file, edit.clone()).await;
            }
        }
        Ok(())
    }

    /// Rewrite a track's title and composer, then (best-effort) its tags.
    pub async fn update_track_info(&self, track_id: i64, update: &TrackUpdate) -> Result<()> {
        let title = update.title.trim();
        if title.is_empty() {
            return Err(Error::invalid("track title must not be empty"));
        }
        let composer = update.composer.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let track = db::get_track(&self.pool, track_id)
            .await?
            .ok_or(Error::TrackNotFound(track_id))?;
        db::update_track(&self.pool, track_id, title, composer).await?;
        tracing::info!(target: "musicly::store", track_id, title, "Track updated");

        if self.options.write_tags {
            write_tags_best_effort(track.path_buf(), TagEdit::track(title, composer)).await;
        }
        Ok(())
    }

    /// Replace an album's cover.
    ///
    /// `album_dir` is where the `cover.<ext>` copy goes; it defaults to the
    /// album's own directory (none for the untagged-files album).
    pub async fn add_cover(
        &self,
        album_id: i64,
        source: CoverSource,
        album_dir: Option<&Path>,
    ) -> Result<MaterializedCover> {
        let album = db::get_album(&self.pool, album_id)
            .await?
            .ok_or(Error::AlbumNotFound(album_id))?;

        let default_dir = (!album.is_unknown()).then(|| PathBuf::from(&album.directory));
        let dir = album_dir.or(default_dir.as_deref());

        let cover = self
            .covers
            .materialize(album_id, source, dir)
            .await
            .with_context(format!("adding cover to album {album_id}"))?;

        if let Some(previous) = &album.cover_path
            && cover.cache_path.as_path() != Path::new(strip_cache_suffix(previous))
        {
            self.covers.cache().remove(previous).await;
        }

        db::set_album_cover(&self.pool, album_id, &cover.stored_path).await?;
        tracing::info!(target: "musicly::library::cover", album_id, path = %cover.stored_path, "Cover replaced");
        Ok(cover)
    }

    /// Delete every row and every cached cover. The library stays usable.
    pub async fn reset(&self) -> Result<()> {
        db::clear_library(&self.pool).await?;
        let cache = self.covers.cache().clone();
        tokio::task::spawn_blocking(move || cache.clear())
            .await?
            .with_context("clearing cover cache")?;
        tracing::info!(target: "musicly::store", "Library reset");
        Ok(())
    }
}

/// Rewrite tags off the async runtime, logging instead of failing.
async fn write_tags_best_effort(path: PathBuf, edit: TagEdit) {
    if !scanner::is_audio_file(&path) {
        return;
    }
    let file = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || metadata::write(&path, &edit)).await;
    let error = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => e.into(),
    };
    tracing::warn!(target: "musicly::library::scan", path = %file, error = %error, "Failed to write tags");
}
