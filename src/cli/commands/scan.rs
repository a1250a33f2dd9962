//! Opening paths and rescanning library roots.

use std::future::Future;
use std::path::Path;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{Context, print_json};
use crate::error::Result;
use crate::library::{Scan, ScanEvent, ScanReport};

/// Ingest a file or directory
pub fn cmd_open(rt: &Runtime, ctx: &mut Context, path: &Path, remember: bool) -> anyhow::Result<()> {
    let report = rt.block_on(async {
        let library = ctx.library().await?;
        let (scan, events) = Scan::with_events();
        let report = drive_scan(&scan, events, library.open_path_with(path, &scan)).await?;
        anyhow::Ok(report)
    })?;

    if remember {
        ctx.remember(path)?;
    }
    print_json(&report)
}

/// Walk every remembered library root
pub fn cmd_rescan(rt: &Runtime, ctx: &Context) -> anyhow::Result<()> {
    let report = rt.block_on(async {
        let library = ctx.library().await?;
        let (scan, events) = Scan::with_events();
        let report = drive_scan(&scan, events, library.rescan(&scan)).await?;
        anyhow::Ok(report)
    })?;
    print_json(&report)
}

/// Run a scan to completion, printing progress and cancelling on Ctrl-C.
async fn drive_scan<F>(
    scan: &Scan,
    mut events: UnboundedReceiver<ScanEvent>,
    scan_future: F,
) -> Result<ScanReport>
where
    F: Future<Output = Result<ScanReport>>,
{
    tokio::pin!(scan_future);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut progress = Progress::default();

    let result = loop {
        tokio::select! {
            result = &mut scan_future => break result,
            Some(event) = events.recv() => progress.on_event(&event),
            _ = &mut ctrl_c, if !scan.is_cancelled() => {
                eprintln!("\nCancelling scan...");
                scan.cancel();
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        progress.on_event(&event);
    }
    result
}

#[derive(Default)]
struct Progress {
    ingested: usize,
}

impl Progress {
    fn on_event(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Ingested { .. } => {
                self.ingested += 1;
                if self.ingested % 100 == 0 {
                    eprintln!("Ingested {} tracks...", self.ingested);
                }
            }
            ScanEvent::Failed { path, error } => {
                eprintln!("Error processing {}: {}", path.display(), error);
            }
            ScanEvent::Skipped(_) => {}
            ScanEvent::Finished(report) => {
                eprintln!(
                    "Scan complete: {} new, {} already present, {} skipped, {} failed.",
                    report.ingested, report.already_present, report.skipped, report.failed
                );
            }
        }
    }
}
