//! Album, track and cover edits.

use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use super::{Context, print_json};
use crate::cover::CoverSource;
use crate::model::{AlbumUpdate, TrackUpdate};

/// Delete an album
pub fn cmd_delete_album(rt: &Runtime, ctx: &Context, album_id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = ctx.library().await?;
        let deleted = library.delete_album(album_id).await?;
        println!(
            "Deleted album {} ({} tracks{}).",
            album_id,
            deleted.tracks,
            if deleted.artist_removed { ", artist removed" } else { "" }
        );
        anyhow::Ok(())
    })
}

/// Change album info
pub fn cmd_update_album(
    rt: &Runtime,
    ctx: &Context,
    album_id: i64,
    title: &str,
    artist: &str,
    genres: &[String],
    tracks: &[PathBuf],
) -> anyhow::Result<()> {
    let update = AlbumUpdate {
        title: title.to_string(),
        artist: artist.to_string(),
        genres: genres.to_vec(),
        tracks: tracks.to_vec(),
    };
    let album = rt.block_on(async {
        let library = ctx.library().await?;
        library.update_album_info(album_id, &update).await?;
        anyhow::Ok(library.get_album(album_id).await?)
    })?;
    print_json(&album)
}

/// Change track info
pub fn cmd_update_track(
    rt: &Runtime,
    ctx: &Context,
    track_id: i64,
    title: &str,
    composer: Option<&str>,
) -> anyhow::Result<()> {
    let update = TrackUpdate {
        title: title.to_string(),
        composer: composer.map(str::to_string),
    };
    rt.block_on(async {
        let library = ctx.library().await?;
        library.update_track_info(track_id, &update).await?;
        println!("Updated track {track_id}.");
        anyhow::Ok(())
    })
}

/// Replace an album cover from an image file
pub fn cmd_add_cover(
    rt: &Runtime,
    ctx: &Context,
    album_id: i64,
    image: &Path,
    album_dir: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = ctx.library().await?;
        let cover = library
            .add_cover(album_id, CoverSource::Path(image.to_path_buf()), album_dir)
            .await?;
        println!("{}", cover.stored_path);
        anyhow::Ok(())
    })
}

/// Empty the library
pub fn cmd_reset(rt: &Runtime, ctx: &Context, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("Refusing to reset the library without --yes");
    }
    rt.block_on(async {
        let library = ctx.library().await?;
        library.reset().await?;
        println!("Library reset.");
        anyhow::Ok(())
    })
}
