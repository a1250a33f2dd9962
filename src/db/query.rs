//! Library-wide search.
//!
//! Album matches are intersected with the genre filter; track matches never
//! are. Callers rely on that asymmetry, so a genre-filtered search still
//! surfaces matching tracks from other genres.

use crate::model::{Album, LibraryView, Track};
use sqlx::sqlite::SqlitePool;

/// Maximum number of tracks returned by a search.
pub const TRACK_RESULT_LIMIT: i64 = 10;

/// Escape `LIKE` wildcards and wrap the query as a substring pattern.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Every distinct genre in the library, alphabetically.
pub async fn all_genres(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT genre FROM genres ORDER BY genre")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(g,)| g).collect())
}

/// Search albums and tracks.
///
/// # Arguments
///
/// * `query` - Case-insensitive substring matched against album titles, track
///   titles and artist names (albums), or track titles and composers (tracks)
/// * `genre` - Exact genre an album must carry; empty means no filter
///
/// With both empty, every album is returned newest first and no tracks.
pub async fn search(pool: &SqlitePool, query: &str, genre: &str) -> sqlx::Result<LibraryView> {
    let genres = all_genres(pool).await?;

    if query.is_empty() && genre.is_empty() {
        let albums = sqlx::query_as::<_, Album>(
            "SELECT id, title, directory, artist_id, disc_count, cover_path FROM albums ORDER BY id DESC",
        )
        .fetch_all(pool)
        .await?;
        return Ok(LibraryView {
            albums,
            tracks: Vec::new(),
            genres,
        });
    }

    let pattern = like_pattern(query);

    let albums = sqlx::query_as::<_, Album>(
        r#"
        SELECT DISTINCT albums.id, albums.title, albums.directory, albums.artist_id,
               albums.disc_count, albums.cover_path
        FROM albums
        JOIN tracks ON tracks.album_id = albums.id
        JOIN artists ON artists.id = albums.artist_id
        WHERE (
            albums.title LIKE ? ESCAPE '\' OR
            tracks.title LIKE ? ESCAPE '\' OR
            artists.name LIKE ? ESCAPE '\'
        )
        AND (? = '' OR albums.id IN (SELECT album_id FROM genres WHERE genre = ?))
        ORDER BY albums.id DESC
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .bind(genre)
    .bind(genre)
    .fetch_all(pool)
    .await?;

    let tracks = sqlx::query_as::<_, Track>(
        r#"
        SELECT id, title, composer, album_id, track_order, disc, path
        FROM tracks
        WHERE title LIKE ? ESCAPE '\' OR composer LIKE ? ESCAPE '\'
        ORDER BY id
        LIMIT ?
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(TRACK_RESULT_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(LibraryView {
        albums,
        tracks,
        genres,
    })
}
