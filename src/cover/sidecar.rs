//! Detect sidecar cover art files in an album directory.
//!
//! Candidates are `cover`, `Cover` and the seeding track's own title, each
//! combined with the extensions below. Extensions are the outer loop: a
//! `Cover.png` beats a `cover.jpg`.

use std::path::{Path, PathBuf};

/// Supported sidecar image extensions, in priority order
pub const SIDECAR_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "jfif"];

/// Fixed base names tried before the track title
const COVER_BASENAMES: &[&str] = &["cover", "Cover"];

/// Find a sidecar cover in `directory`, stopping at the first match.
pub async fn find_sidecar_cover(directory: &Path, track_title: Option<&str>) -> Option<PathBuf> {
    // A title with a separator would escape the directory
    let title = track_title.filter(|t| !t.contains(['/', '\\']));
    let mut names: Vec<&str> = COVER_BASENAMES.to_vec();
    names.extend(title);

    for ext in SIDECAR_EXTENSIONS {
        for name in &names {
            let candidate = directory.join(format!("{name}.{ext}"));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
    }

    None
}
