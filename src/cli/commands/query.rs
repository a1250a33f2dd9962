//! Read-only library queries.

use tokio::runtime::Runtime;

use super::{Context, print_json};

/// Search the library
pub fn cmd_library(rt: &Runtime, ctx: &Context, query: &str, genre: &str) -> anyhow::Result<()> {
    let view = rt.block_on(async {
        let library = ctx.library().await?;
        anyhow::Ok(library.get_library(query, genre).await?)
    })?;
    print_json(&view)
}

/// Show one album
pub fn cmd_album(rt: &Runtime, ctx: &Context, album_id: i64) -> anyhow::Result<()> {
    let album = rt.block_on(async {
        let library = ctx.library().await?;
        anyhow::Ok(library.get_album(album_id).await?)
    })?;
    print_json(&album)
}

/// List an album's tracks
pub fn cmd_tracks(rt: &Runtime, ctx: &Context, album_id: i64) -> anyhow::Result<()> {
    let tracks = rt.block_on(async {
        let library = ctx.library().await?;
        anyhow::Ok(library.get_album_tracks(album_id).await?)
    })?;
    print_json(&tracks)
}

/// Show row counts
pub fn cmd_stats(rt: &Runtime, ctx: &Context) -> anyhow::Result<()> {
    let counts = rt.block_on(async {
        let library = ctx.library().await?;
        anyhow::Ok(library.counts().await?)
    })?;
    print_json(&counts)
}
