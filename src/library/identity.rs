//! Album identity resolution.
//!
//! An album is identified by its (title, directory) pair. The first track
//! seen for an identity seeds the album row; the caller learns whether it
//! did so through [`ResolvedAlbum::seeded`] and only then resolves a cover.
//!
//! At most one row per identity is guaranteed by the store's uniqueness
//! constraint: creation is an `INSERT .. ON CONFLICT DO NOTHING`, so when two
//! ingestion tasks race, exactly one insert returns an id and the other falls
//! back to a lookup.

use sqlx::SqlitePool;

use crate::db::{self, NewAlbum};
use crate::error::{Error, Result};

/// The identity and seeding fields of an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumKey<'a> {
    pub title: &'a str,
    pub directory: &'a str,
    pub artist: &'a str,
    pub disc_count: i64,
}

/// Outcome of [`resolve_album`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAlbum {
    pub id: i64,
    /// True if this call created the album
    pub seeded: bool,
}

/// Find the album for `key`, creating it (and its artist) if needed.
pub async fn resolve_album(pool: &SqlitePool, key: &AlbumKey<'_>) -> Result<ResolvedAlbum> {
    if let Some(id) = db::find_album_id(pool, key.title, key.directory).await? {
        return Ok(ResolvedAlbum { id, seeded: false });
    }

    let mut conn = pool.acquire().await?;
    let artist_id = db::get_or_create_artist(&mut conn, key.artist).await?;
    drop(conn);

    let album = NewAlbum {
        title: key.title,
        directory: key.directory,
        artist_id,
        disc_count: key.disc_count,
    };
    if let Some(id) = db::create_album_if_absent(pool, &album).await? {
        tracing::debug!(
            target: "musicly::library::scan",
            album_id = id,
            title = key.title,
            directory = key.directory,
            "Album created"
        );
        return Ok(ResolvedAlbum { id, seeded: true });
    }

    let id = db::find_album_id(pool, key.title, key.directory)
        .await?
        .ok_or(Error::Database(sqlx::Error::RowNotFound))?;
    Ok(ResolvedAlbum { id, seeded: false })
}
