//! Core data models for the music library.
//!
//! Defines the stored entities [`Artist`], [`Album`] and [`Track`], plus the
//! composite views handed back to callers ([`AlbumDetails`], [`LibraryView`])
//! and the edit payloads ([`AlbumUpdate`], [`TrackUpdate`]).
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `artists` - Artist records with unique names
//! - `albums` - Albums identified by (title, directory), always owned by an artist
//! - `tracks` - Individual audio files, unique by path
//! - `genres` - (album, genre) pairs, unique per album

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::PathBuf;

/// Title used for albums of untagged files.
pub const UNKNOWN_ALBUM: &str = "Unknown album";

/// Artist used for albums of untagged files and albums with no artist tag.
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Identity directory shared by every untagged file, whatever folder it is in.
pub const UNKNOWN_ALBUM_DIRECTORY: &str = "/";

/// Track title used when the tag has none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// An artist in the music library.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Artist {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Artist name (unique)
    pub name: String,
}

/// An album in the music library.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Album {
    /// Database ID (auto-generated, increases with creation time)
    pub id: i64,
    /// Album title
    pub title: String,
    /// Folder the seeding track was discovered in
    pub directory: String,
    /// Owning artist
    pub artist_id: i64,
    /// Number of discs
    pub disc_count: i64,
    /// Cached cover file with a `?t=` cache-busting suffix
    pub cover_path: Option<String>,
}

impl Album {
    /// Whether this is the shared bucket for untagged files.
    pub fn is_unknown(&self) -> bool {
        self.directory == UNKNOWN_ALBUM_DIRECTORY && self.title == UNKNOWN_ALBUM
    }
}

/// A track (audio file) in the music library.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Track {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Track title
    pub title: String,
    /// Composer, if tagged
    pub composer: Option<String>,
    /// Owning album
    pub album_id: i64,
    /// Position within its disc
    pub track_order: Option<i64>,
    /// Disc number (1-based)
    pub disc: i64,
    /// Absolute file path (unique)
    pub path: String,
}

impl Track {
    /// The file path as a `PathBuf`.
    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// An album with its artist name and genre list resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumDetails {
    #[serde(flatten)]
    pub album: Album,
    /// Name of the owning artist
    pub artist: String,
    /// Genres attached to the album
    pub genres: Vec<String>,
}

/// Result of a library search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryView {
    /// Matching albums, newest first
    pub albums: Vec<Album>,
    /// Up to ten matching tracks (never genre-filtered)
    pub tracks: Vec<Track>,
    /// Every distinct genre in the library
    pub genres: Vec<String>,
}

/// New album information supplied by an editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumUpdate {
    pub title: String,
    pub artist: String,
    pub genres: Vec<String>,
    /// Files whose tags should be rewritten to match
    #[serde(default)]
    pub tracks: Vec<PathBuf>,
}

/// New track information supplied by an editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackUpdate {
    pub title: String,
    pub composer: Option<String>,
}
