//! The import pipeline: archive entries in, WebP uploads and a report out.
//!
//! Entries are handled strictly one after another. Each one goes through
//! path resolution, duplicate check, read, sniff, convert and upload, and
//! its outcome is recorded before the next entry starts, so progress only
//! ever moves forward and the duplicate check never races.
//!
//! Only an archive that cannot be opened aborts a run. Anything that goes
//! wrong with a single entry is recorded in the report and the run moves on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::convert::{SourceImage, convert};
use crate::diagnostics::DiagnosticLog;
use crate::error::{ImportError, Result};
use crate::io::ReadAt;
use crate::path;
use crate::report::{EntryOutcome, ImportReport, Progress};
use crate::selection::{Selection, Selections};
use crate::session::ImportSession;
use crate::sniff::sniff;
use crate::upload::UploadSink;
use crate::zip::{ZipArchive, ZipFileEntry};

/// Receives progress of a run, typically to drive a progress bar.
pub trait ImportObserver: Send + Sync {
    /// Called after each selected entry has been recorded.
    fn on_progress(&self, _outcome: &EntryOutcome, _progress: Progress) {}

    /// Called once when the run has completed.
    fn on_finished(&self, _report: &ImportReport) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl ImportObserver for NoopObserver {}

/// Cooperative stop request, honoured between entries only. An entry that
/// is being converted or uploaded always finishes first.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ImportPipeline {
    sink: Arc<dyn UploadSink>,
    verbose_logs: bool,
    observer: Arc<dyn ImportObserver>,
    cancel: CancelFlag,
}

impl ImportPipeline {
    pub fn new(sink: Arc<dyn UploadSink>, config: &ImportConfig) -> Self {
        Self {
            sink,
            verbose_logs: config.verbose_logs,
            observer: Arc::new(NoopObserver),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ImportObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Open the archive behind `reader` and import the selected entries into
    /// `destination_folder`.
    ///
    /// Fails only with [`ImportError::ArchiveOpen`]; per-entry problems are
    /// in the returned report.
    pub async fn run<R: ReadAt>(
        &self,
        reader: Arc<R>,
        selections: &Selections,
        destination_folder: &str,
    ) -> Result<ImportReport> {
        let archive = ZipArchive::open(reader).await.map_err(|e| {
            warn!("Cannot open archive: {:#}", e);
            ImportError::ArchiveOpen(format!("{:#}", e))
        })?;
        Ok(self
            .run_archive(&archive, selections, destination_folder)
            .await)
    }

    /// Import from an archive that is already open.
    pub async fn run_archive<R: ReadAt>(
        &self,
        archive: &ZipArchive<R>,
        selections: &Selections,
        destination_folder: &str,
    ) -> ImportReport {
        let selected = selections.resolve(archive.entries());
        let mut session = ImportSession::new(selected.len(), self.verbose_logs);

        info!(
            entries = selected.len(),
            destination = destination_folder,
            sink = self.sink.name(),
            "Starting import"
        );
        session.diagnostics().record(format!(
            "Starting import of {} entries into {}",
            selected.len(),
            destination_folder
        ));

        let mut cancelled = false;
        for selection in &selected {
            if self.cancel.is_cancelled() {
                info!("Import cancelled after {} entries", session.outcomes().len());
                session.diagnostics().record("Import cancelled");
                cancelled = true;
                break;
            }

            let outcome = self
                .process(archive, selection, destination_folder, &mut session)
                .await;
            let progress = session.record(outcome);
            if let Some(outcome) = session.outcomes().last() {
                debug!(
                    source = %outcome.source,
                    status = ?outcome.status,
                    percent = progress.percent(),
                    "Entry recorded"
                );
                self.observer.on_progress(outcome, progress);
            }
        }

        let report = session.finish(cancelled);
        info!("Import finished: {}", report.summary());
        self.observer.on_finished(&report);
        report
    }

    async fn process<R: ReadAt>(
        &self,
        archive: &ZipArchive<R>,
        selection: &Selection,
        destination_folder: &str,
        session: &mut ImportSession,
    ) -> EntryOutcome {
        let source = selection.archive_path.as_str();
        let entry = archive.entry(source);

        if source.is_empty() || source.ends_with('/') || entry.is_some_and(|e| e.is_directory) {
            return EntryOutcome::ignored(source);
        }

        let destination = path::resolve(destination_folder, source);
        // Reserved before any work so a later entry with the same name is a
        // duplicate even if this one fails.
        if !session.reserve(&destination) {
            session
                .diagnostics()
                .record(format!("Skipping {}: {} already imported", source, destination));
            return EntryOutcome::skipped(source, &destination);
        }

        match self
            .import_entry(archive, entry, source, destination_folder, session.diagnostics())
            .await
        {
            Ok(uploaded_as) => {
                session
                    .diagnostics()
                    .record(format!("Imported {} as {}", source, uploaded_as));
                EntryOutcome::uploaded(source, &destination, uploaded_as)
            }
            Err(err) => {
                warn!("Error importing {} to {}: {}", source, destination_folder, err);
                session
                    .diagnostics()
                    .record(format!("Failed {}: {}", source, err));
                EntryOutcome::failed(source, &destination, &err)
            }
        }
    }

    async fn import_entry<R: ReadAt>(
        &self,
        archive: &ZipArchive<R>,
        entry: Option<&ZipFileEntry>,
        source: &str,
        destination_folder: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<String> {
        let entry = entry.ok_or_else(|| ImportError::MissingEntry(source.to_string()))?;

        let bytes = archive
            .read_entry(entry)
            .await
            .map_err(|e| ImportError::Read(format!("{:#}", e)))?;

        let kind = sniff(&bytes);
        diagnostics.record(format!("{} ({} bytes) sniffed as {}", source, bytes.len(), kind));

        let converted = convert(SourceImage {
            file_name: path::file_name(source).to_string(),
            kind,
            bytes,
        })
        .await?;
        diagnostics.record(format!(
            "Converted {} to {} ({} bytes)",
            source,
            converted.file_name,
            converted.len()
        ));

        Ok(self.sink.upload(&converted, destination_folder).await?)
    }
}
