//! Musicly - a local music library.
//!
//! Walks folders of audio files, groups tracks into albums by (title,
//! directory), resolves album covers and keeps everything in SQLite for
//! searching and editing.
//!
//! The entry point is [`library::Library`].

pub mod cli;
pub mod config;
pub mod cover;
pub mod db;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;
