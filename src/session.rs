use std::collections::HashSet;

use crate::diagnostics::DiagnosticLog;
use crate::report::{EntryOutcome, EntryStatus, ImportReport, Progress, RunState};

/// State of a single import run. Created when the run starts and consumed
/// into the [`ImportReport`] when it ends; never shared between runs.
#[derive(Debug)]
pub struct ImportSession {
    produced: HashSet<String>,
    total: usize,
    outcomes: Vec<EntryOutcome>,
    diagnostics: DiagnosticLog,
}

impl ImportSession {
    pub fn new(total: usize, verbose_logs: bool) -> Self {
        Self {
            produced: HashSet::new(),
            total,
            outcomes: Vec::with_capacity(total),
            diagnostics: DiagnosticLog::new(verbose_logs),
        }
    }

    /// Claim a destination path. Returns `false` if it was already claimed
    /// in this session.
    pub fn reserve(&mut self, destination: &str) -> bool {
        if self.produced.contains(destination) {
            return false;
        }
        self.produced.insert(destination.to_string())
    }

    pub fn is_reserved(&self, destination: &str) -> bool {
        self.produced.contains(destination)
    }

    /// Record the outcome of one entry and return the updated progress.
    pub fn record(&mut self, outcome: EntryOutcome) -> Progress {
        self.outcomes.push(outcome);
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.outcomes.len(),
            total: self.total,
        }
    }

    pub fn diagnostics(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    pub fn outcomes(&self) -> &[EntryOutcome] {
        &self.outcomes
    }

    pub fn finish(self, cancelled: bool) -> ImportReport {
        let count = |status: EntryStatus| self.outcomes.iter().filter(|o| o.status == status).count();

        ImportReport {
            state: RunState::Completed,
            total_selected: self.total,
            succeeded: count(EntryStatus::Uploaded),
            skipped_duplicate: count(EntryStatus::SkippedDuplicate),
            ignored: count(EntryStatus::Ignored),
            failed: count(EntryStatus::Failed),
            cancelled,
            entries: self.outcomes,
            diagnostics: self.diagnostics.into_lines(),
        }
    }
}
