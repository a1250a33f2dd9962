//! Database module for artist, album, track and genre persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage. The
//! schema's uniqueness constraints carry the identity rules:
//!
//! - `artists(name)` - one row per exact name
//! - `albums(title, directory)` - one row per album identity
//! - `tracks(path)` - a file is never ingested twice
//! - `genres(album_id, genre)` - an album never carries a genre twice
//!
//! Creation goes through `INSERT .. ON CONFLICT DO NOTHING`, so concurrent
//! ingestion tasks racing on the same identity can never create two rows.
//!
//! # Example
//!
//! ```ignore
//! use musicly::db::{init_db, get_album_tracks};
//!
//! let pool = init_db("sqlite:library.db").await?;
//! let tracks = get_album_tracks(&pool, 1).await?;
//! ```

pub mod query;

use std::str::FromStr;
use std::time::Duration;

use crate::model::{Album, Artist, Track};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub use query::search;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "library.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, enables foreign keys and
/// WAL, and gives every connection a busy timeout so concurrent ingestion
/// tasks queue on the write lock instead of failing.
///
/// # Errors
///
/// Returns an error if the database cannot be created or opened, or if a
/// migration fails. Either one means the store is unusable.
pub async fn init_db(db_url: &str) -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// ============================================================================
// Identity resolution
// ============================================================================

/// Get or create an artist by exact name.
///
/// Idempotent and race-free: the insert is ignored when the name exists.
pub async fn get_or_create_artist(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<i64> {
    sqlx::query("INSERT INTO artists (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM artists WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Look up an album by its identity.
pub async fn find_album_id(
    pool: &SqlitePool,
    title: &str,
    directory: &str,
) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM albums WHERE title = ? AND directory = ?")
        .bind(title)
        .bind(directory)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| id))
}

/// Fields of an album row about to be created.
#[derive(Debug, Clone)]
pub struct NewAlbum<'a> {
    pub title: &'a str,
    pub directory: &'a str,
    pub artist_id: i64,
    pub disc_count: i64,
}

/// Create an album unless its (title, directory) identity already exists.
///
/// Returns the new id, or `None` if another task created it first.
pub async fn create_album_if_absent(
    pool: &SqlitePool,
    album: &NewAlbum<'_>,
) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO albums (title, directory, artist_id, disc_count)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(title, directory) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(album.title)
    .bind(album.directory)
    .bind(album.artist_id)
    .bind(album.disc_count)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}

// ============================================================================
// Tracks and genres
// ============================================================================

/// Fields of a track row about to be created.
#[derive(Debug, Clone)]
pub struct NewTrack<'a> {
    pub title: &'a str,
    pub composer: Option<&'a str>,
    pub album_id: i64,
    pub track_order: Option<i64>,
    pub disc: i64,
    pub path: &'a str,
}

/// Find the track stored for a file path.
pub async fn find_track_id_by_path(pool: &SqlitePool, path: &str) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM tracks WHERE path = ?")
        .bind(path)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| id))
}

/// Insert a track. Returns `None` if the path is already stored.
///
/// Existing rows are never updated in place.
pub async fn insert_track(pool: &SqlitePool, track: &NewTrack<'_>) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO tracks (title, composer, album_id, track_order, disc, path)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(track.title)
    .bind(track.composer)
    .bind(track.album_id)
    .bind(track.track_order)
    .bind(track.disc)
    .bind(track.path)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}

/// Attach a genre to an album. Returns false if the album already had it.
pub async fn insert_genre(conn: &mut SqliteConnection, album_id: i64, genre: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO genres (album_id, genre) VALUES (?, ?)")
        .bind(album_id)
        .bind(genre)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Reads
// ============================================================================

const ALBUM_COLUMNS: &str = "id, title, directory, artist_id, disc_count, cover_path";
const TRACK_COLUMNS: &str = "id, title, composer, album_id, track_order, disc, path";

/// Get an album by its database ID.
pub async fn get_album(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Option<Album>> {
    sqlx::query_as::<_, Album>(&format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?"))
        .bind(album_id)
        .fetch_optional(pool)
        .await
}

/// Get an artist by its database ID.
pub async fn get_artist(pool: &SqlitePool, artist_id: i64) -> sqlx::Result<Option<Artist>> {
    sqlx::query_as::<_, Artist>("SELECT id, name FROM artists WHERE id = ?")
        .bind(artist_id)
        .fetch_optional(pool)
        .await
}

/// Genres of an album, in the order they were first attached.
pub async fn get_album_genres(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT genre FROM genres WHERE album_id = ? ORDER BY rowid")
            .bind(album_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(g,)| g).collect())
}

/// Tracks of an album ordered by disc, then position on the disc.
pub async fn get_album_tracks(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<Track>> {
    sqlx::query_as::<_, Track>(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks WHERE album_id = ? ORDER BY disc, track_order, id"
    ))
    .bind(album_id)
    .fetch_all(pool)
    .await
}

/// Get a track by its database ID.
pub async fn get_track(pool: &SqlitePool, track_id: i64) -> sqlx::Result<Option<Track>> {
    sqlx::query_as::<_, Track>(&format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?"))
        .bind(track_id)
        .fetch_optional(pool)
        .await
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct LibraryCounts {
    pub artists: i64,
    pub albums: i64,
    pub tracks: i64,
    pub genres: i64,
}

/// Count the rows of every table.
pub async fn library_counts(pool: &SqlitePool) -> sqlx::Result<LibraryCounts> {
    sqlx::query_as::<_, LibraryCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM artists) AS artists,
            (SELECT COUNT(*) FROM albums) AS albums,
            (SELECT COUNT(*) FROM tracks) AS tracks,
            (SELECT COUNT(*) FROM genres) AS genres
        "#,
    )
    .fetch_one(pool)
    .await
}

// ============================================================================
// Edits
// ============================================================================

/// Record a materialized cover on an album.
pub async fn set_album_cover(pool: &SqlitePool, album_id: i64, cover_path: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE albums SET cover_path = ? WHERE id = ?")
        .bind(cover_path)
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete an artist if no album references it. Returns whether it was removed.
pub async fn delete_artist_if_orphaned(conn: &mut SqliteConnection, artist_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "DELETE FROM artists WHERE id = ? AND NOT EXISTS (SELECT 1 FROM albums WHERE artist_id = ?)",
    )
    .bind(artist_id)
    .bind(artist_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// What a cascading album delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedAlbum {
    pub tracks: u64,
    pub artist_removed: bool,
}

/// Delete an album with its tracks and genres, and its artist if orphaned.
///
/// Runs in one transaction whose first statement is a write, so it takes the
/// write lock up front instead of upgrading a read snapshot.
pub async fn delete_album(pool: &SqlitePool, album: &Album) -> sqlx::Result<DeletedAlbum> {
    let mut tx = pool.begin().await?;

    let tracks = sqlx::query("DELETE FROM tracks WHERE album_id = ?")
        .bind(album.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM genres WHERE album_id = ?")
        .bind(album.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM albums WHERE id = ?")
        .bind(album.id)
        .execute(&mut *tx)
        .await?;

    let artist_removed = delete_artist_if_orphaned(&mut tx, album.artist_id).await?;

    tx.commit().await?;

    Ok(DeletedAlbum {
        tracks,
        artist_removed,
    })
}

/// Rewrite an album's title, artist and genre set.
///
/// The genre rows are removed en masse and rewritten; the previous artist is
/// deleted if nothing references it any more.
pub async fn update_album(
    pool: &SqlitePool,
    album: &Album,
    title: &str,
    artist: &str,
    genres: &[String],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    let artist_id = get_or_create_artist(&mut tx, artist).await?;

    sqlx::query("UPDATE albums SET title = ?, artist_id = ? WHERE id = ?")
        .bind(title)
        .bind(artist_id)
        .bind(album.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM genres WHERE album_id = ?")
        .bind(album.id)
        .execute(&mut *tx)
        .await?;

    for genre in genres {
        insert_genre(&mut tx, album.id, genre).await?;
    }

    if album.artist_id != artist_id {
        delete_artist_if_orphaned(&mut tx, album.artist_id).await?;
    }

    tx.commit().await
}

/// Rewrite a track's title and composer.
pub async fn update_track(
    pool: &SqlitePool,
    track_id: i64,
    title: &str,
    composer: Option<&str>,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE tracks SET title = ?, composer = ? WHERE id = ?")
        .bind(title)
        .bind(composer)
        .bind(track_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every row of the library.
pub async fn clear_library(pool: &SqlitePool) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for table in ["genres", "tracks", "albums", "artists"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}
