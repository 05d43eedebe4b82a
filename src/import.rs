use crate::error::ImportError;
use crate::fragment::{FragmentAssembler, FragmentKind};
use crate::namespace::decode_namespaces;
use crate::page::decode_page;
use crate::progress::{throughput, ProgressReporter, ProgressUpdate};
use crate::reader::{open_dump, DumpLines};
use crate::sink::Sink;
use crate::stats::ImportStats;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared stop signal, checked after each completed fragment.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Stop after this many page fragments.
    pub limit: Option<u64>,
    pub cancel: CancelFlag,
}

/// Opens `path`, imports it into `sink`, and closes the sink on every exit path.
pub fn import_dump<S, P>(
    path: &Path,
    sink: &mut S,
    progress: &mut P,
    options: &ImportOptions,
) -> Result<ImportStats, ImportError>
where
    S: Sink + ?Sized,
    P: ProgressReporter + ?Sized,
{
    info!(path = %path.display(), "Starting import");
    let outcome = open_dump(path).and_then(|input| drive(input, sink, progress, options));
    finish(outcome, sink)
}

/// Imports an already-decompressed stream. The sink is closed before returning.
pub fn import_stream<R, S, P>(
    input: R,
    sink: &mut S,
    progress: &mut P,
    options: &ImportOptions,
) -> Result<ImportStats, ImportError>
where
    R: BufRead,
    S: Sink + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let outcome = drive(input, sink, progress, options);
    finish(outcome, sink)
}

fn finish<S: Sink + ?Sized>(
    outcome: Result<ImportStats, ImportError>,
    sink: &mut S,
) -> Result<ImportStats, ImportError> {
    let closed = sink.close();
    match (outcome, closed) {
        (Ok(stats), Ok(())) => Ok(stats),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "Failed to close sink after import error");
            Err(e)
        }
    }
}

fn drive<R, S, P>(
    input: R,
    sink: &mut S,
    progress: &mut P,
    options: &ImportOptions,
) -> Result<ImportStats, ImportError>
where
    R: BufRead,
    S: Sink + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let start = Instant::now();
    let mut stats = ImportStats::new();
    let mut lines = DumpLines::new(input);
    let mut assembler = FragmentAssembler::new();
    let mut stopped_early = false;

    for line in lines.by_ref() {
        let line = line?;
        let Some(fragment) = assembler.push_line(&line) else {
            continue;
        };

        let outcome = match fragment.kind {
            FragmentKind::Namespaces => import_namespaces(&fragment.body, sink, &mut stats),
            FragmentKind::Page => import_page(&fragment.body, sink, &mut stats),
        };
        if let Err(e) = outcome {
            if e.is_fatal() {
                return Err(e);
            }
            record_failure(&e, &mut stats);
        }

        if fragment.kind == FragmentKind::Page {
            stats.inc_pages_processed();
            let elapsed = start.elapsed();
            progress.report(&ProgressUpdate {
                elapsed,
                throughput: throughput(stats.pages_processed, elapsed),
                pages: stats.pages_processed,
                revisions: stats.revisions_saved,
                title: stats.last_title(),
            });
        }

        if options.cancel.is_cancelled() {
            info!(pages = stats.pages_processed, "Import cancelled");
            stats.cancelled = true;
            stopped_early = true;
            break;
        }
        if options
            .limit
            .is_some_and(|limit| stats.pages_processed >= limit)
        {
            info!(pages = stats.pages_processed, "Page limit reached");
            stopped_early = true;
            break;
        }
    }

    stats.lines_read = lines.lines_read();
    stats.stray_close_markers = assembler.stray_close_markers();
    progress.finish();
    if stopped_early {
        assembler.reset();
    } else {
        assembler.finish()?;
    }

    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        namespaces = stats.namespaces_saved,
        pages = stats.pages_saved,
        revisions = stats.revisions_saved,
        skipped = stats.pages_skipped,
        sink_failures = stats.sink_failures,
        "Import finished"
    );
    Ok(stats)
}

fn import_namespaces<S: Sink + ?Sized>(
    body: &str,
    sink: &mut S,
    stats: &mut ImportStats,
) -> Result<(), ImportError> {
    let entries = decode_namespaces(body)?;
    debug!(count = entries.len(), "Namespace catalog decoded");
    for entry in &entries {
        match sink.save_namespace(entry) {
            Ok(()) => stats.inc_namespaces(),
            Err(e) => {
                stats.inc_sink_failures();
                warn!(id = entry.id, error = %e, "Sink rejected namespace");
            }
        }
    }
    Ok(())
}

fn import_page<S: Sink + ?Sized>(
    body: &str,
    sink: &mut S,
    stats: &mut ImportStats,
) -> Result<(), ImportError> {
    let bundle = decode_page(body)?;
    stats.set_last_title(&bundle.page.title);

    if let Err(e) = sink.save_page(&bundle) {
        warn!(page_id = bundle.page.id, error = %e, "Sink failed to store page");
        return Err(e.into());
    }
    stats.inc_pages_saved();
    if bundle.revision.is_some() {
        stats.inc_revisions_saved();
    }
    Ok(())
}

/// Accounts for a fragment error that does not end the run.
fn record_failure(err: &ImportError, stats: &mut ImportStats) {
    match err {
        ImportError::Sink(sink_err) => {
            stats.inc_sink_failures();
            if sink_err.page_persisted() {
                stats.inc_pages_saved();
            }
        }
        _ => {
            stats.inc_pages_skipped();
            warn!(error = %err, "Skipping page fragment");
        }
    }
}
