//! Album cover resolution and caching.
//!
//! A new album's cover is resolved once, from its seeding track, with strict
//! priority ordering:
//!
//! 1. **Embedded tags** - the picture in the seeding track's tags
//! 2. **Sidecar files** - `cover`, `Cover` or `<track title>` with an image
//!    extension, in the album directory
//!
//! Whatever wins is *materialized*: written into the cover cache as
//! `<album id>.<ext>` and copied next to the music as `cover.<ext>`. The path
//! stored on the album carries a `?t=<millis>` suffix so UI image caches reload
//! after a replacement.

mod cache;
mod resolver;
mod sidecar;

pub use cache::{CoverCache, strip_cache_suffix};
pub use resolver::{CoverResolver, CoverSource, MaterializedCover};
pub use sidecar::{SIDECAR_EXTENSIONS, find_sidecar_cover};

use serde::{Deserialize, Serialize};

/// Image formats accepted for embedded and raw-byte covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension used for cached copies.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Map a declared MIME type; anything but JPEG/PNG is rejected.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }
}
