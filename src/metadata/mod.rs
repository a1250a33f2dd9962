//! Audio file metadata reading and writing.
//!
//! Uses the lofty crate for format-independent tag access. Tag values are
//! untyped at this boundary; [`read`] validates and normalizes them into a
//! strict [`TrackMetadata`] straight away so nothing loosely-typed reaches the
//! store.
//!
//! Writing is the best-effort side channel used by album/track edits: callers
//! log failures instead of propagating them.

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::file::{TaggedFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::path::Path;

use crate::cover::ImageFormat;
use crate::error::{Error, Result};

/// A picture embedded in the file's tags, already restricted to formats we cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPicture {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// Normalized tag fields of one audio file.
///
/// Empty or whitespace-only tag values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub album: Option<String>,
    /// Album artist, falling back to the track artist
    pub album_artist: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub disc_total: Option<u32>,
    /// Raw genre items, still delimiter-separated
    pub genres: Vec<String>,
    pub picture: Option<EmbeddedPicture>,
}

/// Tag fields to rewrite. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEdit {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
}

impl TagEdit {
    /// Edit applied to every file of an album after its info changes.
    pub fn album(title: &str, artist: &str, genres: &[String]) -> Self {
        Self {
            album: Some(title.to_string()),
            album_artist: Some(artist.to_string()),
            genre: Some(genres.join(", ")),
            ..Default::default()
        }
    }

    /// Edit applied to a single file after its track info changes.
    pub fn track(title: &str, composer: Option<&str>) -> Self {
        Self {
            title: Some(title.to_string()),
            composer: composer.map(str::to_string),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.composer.is_none()
            && self.album.is_none()
            && self.album_artist.is_none()
            && self.genre.is_none()
    }
}

/// Read and normalize the tags of an audio file.
///
/// Files with no tag at all yield a default (all-`None`) [`TrackMetadata`];
/// only unreadable files are errors.
pub fn read(path: &Path) -> Result<TrackMetadata> {
    let tagged_file = probe(path)
        .map_err(|e| Error::metadata(path, format!("failed to read file metadata: {e}")))?;

    // Get the primary tag, or fall back to the first available tag
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(TrackMetadata::default());
    };

    Ok(from_tag(tag))
}

/// Open a file, sniffing its real format rather than trusting the extension.
fn probe(path: &Path) -> std::result::Result<TaggedFile, LoftyError> {
    Probe::open(path)?.guess_file_type()?.read()
}

fn from_tag(tag: &Tag) -> TrackMetadata {
    let artist = clean(tag.artist().as_deref());
    let album_artist = clean(tag.get_string(&ItemKey::AlbumArtist)).or(artist);

    let genres = tag
        .get_strings(&ItemKey::Genre)
        .filter_map(|g| clean(Some(g)))
        .collect();

    TrackMetadata {
        title: clean(tag.title().as_deref()),
        composer: clean(tag.get_string(&ItemKey::Composer)),
        album: clean(tag.album().as_deref()),
        album_artist,
        track_number: tag.track(),
        disc_number: tag.disk(),
        disc_total: tag.disk_total(),
        genres,
        picture: pick_picture(tag.pictures()),
    }
}

/// Front cover if present, else the first picture; only JPEG and PNG qualify.
fn pick_picture(pictures: &[Picture]) -> Option<EmbeddedPicture> {
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let format = match picture.mime_type() {
        Some(MimeType::Jpeg) => ImageFormat::Jpeg,
        Some(MimeType::Png) => ImageFormat::Png,
        _ => return None,
    };

    Some(EmbeddedPicture {
        data: picture.data().to_vec(),
        format,
    })
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Rewrite tag fields in an audio file.
///
/// Updates the file's primary tag, creating one of the format's native type
/// if the file has none.
pub fn write(path: &Path, edit: &TagEdit) -> Result<()> {
    if edit.is_empty() {
        return Ok(());
    }

    let mut tagged_file = probe(path)
        .map_err(|e| Error::metadata(path, format!("failed to read file for tag writing: {e}")))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| Error::metadata(path, "file format does not accept tags"))?;

    if let Some(title) = &edit.title {
        tag.set_title(title.clone());
    }
    if let Some(composer) = &edit.composer {
        tag.insert_text(ItemKey::Composer, composer.clone());
    }
    if let Some(album) = &edit.album {
        tag.set_album(album.clone());
    }
    if let Some(artist) = &edit.album_artist {
        tag.insert_text(ItemKey::AlbumArtist, artist.clone());
    }
    if let Some(genre) = &edit.genre {
        if genre.is_empty() {
            tag.remove_genre();
        } else {
            tag.set_genre(genre.clone());
        }
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| Error::metadata(path, format!("failed to write tags: {e}")))
}
