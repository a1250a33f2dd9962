//! CLI command definitions and dispatch.
//!
//! Each subcommand maps onto one library operation. Query results are printed
//! to stdout as JSON so another process (a UI shell) can consume them;
//! progress and logs go to stderr.
//!
//! - `scan`: opening paths and rescanning library roots
//! - `query`: searching and reading albums
//! - `edit`: album, track and cover edits, deletion and reset

mod edit;
mod query;
mod scan;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::library::Library;

pub use edit::{cmd_add_cover, cmd_delete_album, cmd_reset, cmd_update_album, cmd_update_track};
pub use query::{cmd_album, cmd_library, cmd_stats, cmd_tracks};
pub use scan::{cmd_open, cmd_rescan};

/// Musicly CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory holding the library database and cover cache
    #[arg(long, global = true, env = "MUSICLY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a file, or every file under a directory
    Open {
        /// File or directory to open
        path: PathBuf,
        /// Add the path to the remembered library roots
        #[arg(long)]
        remember: bool,
    },
    /// Walk every remembered library root again
    Rescan,
    /// Search the library (everything when no filter is given)
    Library {
        /// Substring to match against titles, artists and composers
        #[arg(short, long, default_value = "")]
        query: String,
        /// Only albums tagged with this genre
        #[arg(short, long, default_value = "")]
        genre: String,
    },
    /// Show an album with its artist and genres
    Album {
        /// Album ID
        id: i64,
    },
    /// List an album's tracks by disc and position
    Tracks {
        /// Album ID
        id: i64,
    },
    /// Delete an album, its tracks and its cover
    DeleteAlbum {
        /// Album ID
        id: i64,
    },
    /// Change an album's title, artist and genres
    UpdateAlbum {
        /// Album ID
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        /// Genre (repeatable)
        #[arg(long = "genre")]
        genres: Vec<String>,
        /// Files whose tags to rewrite (defaults to every track of the album)
        #[arg(long = "track")]
        tracks: Vec<PathBuf>,
    },
    /// Change a track's title and composer
    UpdateTrack {
        /// Track ID
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        composer: Option<String>,
    },
    /// Replace an album's cover with an image file
    AddCover {
        /// Album ID
        id: i64,
        /// Image file (png, jpeg, jpg or jfif)
        image: PathBuf,
        /// Folder to receive the cover.<ext> copy (defaults to the album's)
        #[arg(long)]
        album_dir: Option<PathBuf>,
    },
    /// Show row counts
    Stats,
    /// Delete everything from the library
    Reset {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let mut ctx = Context::load(cli);

    match &cli.command {
        Commands::Open { path, remember } => cmd_open(&rt, &mut ctx, path, *remember),
        Commands::Rescan => cmd_rescan(&rt, &ctx),
        Commands::Library { query, genre } => cmd_library(&rt, &ctx, query, genre),
        Commands::Album { id } => cmd_album(&rt, &ctx, *id),
        Commands::Tracks { id } => cmd_tracks(&rt, &ctx, *id),
        Commands::DeleteAlbum { id } => cmd_delete_album(&rt, &ctx, *id),
        Commands::UpdateAlbum {
            id,
            title,
            artist,
            genres,
            tracks,
        } => cmd_update_album(&rt, &ctx, *id, title, artist, genres, tracks),
        Commands::UpdateTrack {
            id,
            title,
            composer,
        } => cmd_update_track(&rt, &ctx, *id, title, composer.as_deref()),
        Commands::AddCover {
            id,
            image,
            album_dir,
        } => cmd_add_cover(&rt, &ctx, *id, image, album_dir.as_deref()),
        Commands::Stats => cmd_stats(&rt, &ctx),
        Commands::Reset { yes } => cmd_reset(&rt, &ctx, *yes),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Loaded configuration plus where it came from.
pub struct Context {
    config: Config,
    config_path: Option<PathBuf>,
}

impl Context {
    fn load(cli: &Cli) -> Self {
        let config_path = cli.config.clone().or_else(config::config_path);
        let mut config = match &config_path {
            Some(path) => config::load_from(path),
            None => Config::default(),
        };
        if let Some(dir) = &cli.data_dir {
            config.library.data_dir = Some(dir.clone());
        }
        Self {
            config,
            config_path,
        }
    }

    /// Open the configured library.
    pub(crate) async fn library(&self) -> anyhow::Result<Library> {
        Ok(Library::open(&self.config).await?)
    }

    /// Remember a library root and persist the config.
    pub(crate) fn remember(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = std::path::absolute(path)?;
        if !self.config.remember_path(&path) {
            return Ok(());
        }
        let Some(config_path) = &self.config_path else {
            anyhow::bail!("Could not determine config directory");
        };
        config::save_to(&self.config, config_path)?;
        Ok(())
    }
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
