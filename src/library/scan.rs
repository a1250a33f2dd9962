//! Scan handles, progress events and reports.
//!
//! A [`Scan`] is passed into [`Library::open_path_with`]. It carries the
//! cancellation token and, optionally, the sending half of a channel on which
//! a UI receives [`ScanEvent`]s as files are ingested.
//!
//! [`Library::open_path_with`]: super::Library::open_path_with

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{IngestOutcome, Library};
use crate::error::{Error, Result};
use crate::scanner::FileVisitor;

/// Progress notification emitted during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A new track was stored
    Ingested {
        path: PathBuf,
        album_id: i64,
        new_album: bool,
    },
    /// The file is not a supported audio file
    Skipped(PathBuf),
    /// The file could not be ingested; the scan went on
    Failed { path: PathBuf, error: String },
    /// The scan is complete
    Finished(ScanReport),
}

/// Per-scan file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// New tracks stored
    pub ingested: usize,
    /// Files already in the library
    pub already_present: usize,
    /// Files with unsupported extensions
    pub skipped: usize,
    /// Files that failed to ingest
    pub failed: usize,
}

/// Handle controlling one scan.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl Scan {
    /// A scan without an event channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scan plus the receiver for its events.
    pub fn with_events() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scan = Self {
            cancel: CancellationToken::new(),
            events: Some(tx),
        };
        (scan, rx)
    }

    /// Stop the scan at the next directory or file boundary.
    ///
    /// A file already being ingested is finished first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening
            let _ = tx.send(event);
        }
    }
}

/// Ingests walked files into a library and tallies the outcome.
pub(crate) struct ScanVisitor<'a> {
    library: &'a Library,
    scan: &'a Scan,
    report: Mutex<ScanReport>,
}

impl<'a> ScanVisitor<'a> {
    pub(crate) fn new(library: &'a Library, scan: &'a Scan) -> Self {
        Self {
            library,
            scan,
            report: Mutex::new(ScanReport::default()),
        }
    }

    /// Close the scan: emit and return the final report.
    pub(crate) fn finish(self) -> ScanReport {
        let report = self.report.into_inner();
        tracing::info!(
            target: "musicly::library::scan",
            ingested = report.ingested,
            already_present = report.already_present,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = self.scan.is_cancelled(),
            "Scan finished"
        );
        self.scan.emit(ScanEvent::Finished(report));
        report
    }
}

#[async_trait]
impl FileVisitor for ScanVisitor<'_> {
    async fn visit(&self, path: &Path) -> Result<()> {
        match self.library.ingest(path).await? {
            IngestOutcome::Ingested {
                album_id,
                new_album,
                ..
            } => {
                self.report.lock().ingested += 1;
                self.scan.emit(ScanEvent::Ingested {
                    path: path.to_path_buf(),
                    album_id,
                    new_album,
                });
            }
            IngestOutcome::AlreadyPresent => self.report.lock().already_present += 1,
            IngestOutcome::Unsupported => {
                self.report.lock().skipped += 1;
                self.scan.emit(ScanEvent::Skipped(path.to_path_buf()));
            }
        }
        Ok(())
    }

    fn failed(&self, path: &Path, error: &Error) {
        self.report.lock().failed += 1;
        self.scan.emit(ScanEvent::Failed {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }
}
