//! Test utilities and fixtures for musicly tests.
//!
//! Provides throwaway stores and libraries, plus real (if silent) audio files
//! tagged through lofty so ingestion tests exercise the actual tag reader.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{temp_library, tagged_wav, TagSpec};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (library, dir) = temp_library().await;
//!     let song = tagged_wav(dir.path(), "song.wav", &TagSpec { album: Some("Foo"), ..Default::default() });
//!     library.open_path(&song).await.unwrap();
//! }
//! ```

use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::library::{Library, LibraryOptions};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = crate::db::db_url(Some(&db_path));

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates a library whose data directory lives in a temporary directory.
///
/// Music fixtures can be written into the same directory; the data directory
/// is the `data` subfolder.
pub async fn temp_library() -> (Library, TempDir) {
    temp_library_with(LibraryOptions::default()).await
}

/// [`temp_library`] with explicit options.
pub async fn temp_library_with(options: LibraryOptions) -> (Library, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let library = Library::open_in(&dir.path().join("data"), options)
        .await
        .expect("Failed to open test library");
    (library, dir)
}

/// Write a one-second silent 8 kHz mono WAV file.
pub fn write_silent_wav(path: &Path) {
    const SAMPLE_RATE: u32 = 8_000;
    const BITS: u16 = 16;
    const CHANNELS: u16 = 1;
    let block_align = CHANNELS * BITS / 8;
    let data_len = SAMPLE_RATE * u32::from(block_align);

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&CHANNELS.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * u32::from(block_align)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BITS.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(path, bytes).expect("Failed to write WAV fixture");
}

/// Tag fields for a fixture file. Unset fields are left out of the tag.
#[derive(Debug, Clone, Default)]
pub struct TagSpec<'a> {
    pub title: Option<&'a str>,
    pub album: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub album_artist: Option<&'a str>,
    pub composer: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub disc_total: Option<u32>,
    pub picture: Option<(MimeType, &'a [u8])>,
}

/// Write a silent WAV at `dir/name` carrying an ID3v2 tag built from `spec`.
pub fn tagged_wav(dir: &Path, name: &str, spec: &TagSpec<'_>) -> PathBuf {
    let path = dir.join(name);
    write_silent_wav(&path);

    let mut tag = Tag::new(TagType::Id3v2);
    if let Some(title) = spec.title {
        tag.set_title(title.to_string());
    }
    if let Some(album) = spec.album {
        tag.set_album(album.to_string());
    }
    if let Some(artist) = spec.artist {
        tag.set_artist(artist.to_string());
    }
    if let Some(album_artist) = spec.album_artist {
        tag.insert_text(ItemKey::AlbumArtist, album_artist.to_string());
    }
    if let Some(composer) = spec.composer {
        tag.insert_text(ItemKey::Composer, composer.to_string());
    }
    if let Some(genre) = spec.genre {
        tag.set_genre(genre.to_string());
    }
    if let Some(track) = spec.track {
        tag.set_track(track);
    }
    if let Some(disc) = spec.disc {
        tag.set_disk(disc);
    }
    if let Some(total) = spec.disc_total {
        tag.set_disk_total(total);
    }
    if let Some((mime, data)) = &spec.picture {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime.clone()),
            None,
            data.to_vec(),
        ));
    }

    tag.save_to_path(&path, WriteOptions::default())
        .expect("Failed to tag WAV fixture");
    path
}
