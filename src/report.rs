//! Outcome of an import run.

use serde::Serialize;

use crate::error::{ErrorKind, ImportError};

/// Lifecycle of a run. `Running` is only observable through progress
/// callbacks; a returned report is always `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// What happened to one selected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Uploaded,
    /// Destination already produced earlier in the run.
    SkippedDuplicate,
    /// Directory entry or empty path.
    Ignored,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub source: String,
    pub destination: String,
    pub status: EntryStatus,
    /// Path or URL reported by the upload sink.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EntryOutcome {
    pub fn uploaded(source: &str, destination: &str, uploaded_as: String) -> Self {
        Self::new(source, destination, EntryStatus::Uploaded, Some(uploaded_as), None)
    }

    pub fn skipped(source: &str, destination: &str) -> Self {
        Self::new(source, destination, EntryStatus::SkippedDuplicate, None, None)
    }

    pub fn ignored(source: &str) -> Self {
        Self::new(source, "", EntryStatus::Ignored, None, None)
    }

    pub fn failed(source: &str, destination: &str, error: &ImportError) -> Self {
        Self::new(source, destination, EntryStatus::Failed, None, Some(error))
    }

    fn new(
        source: &str,
        destination: &str,
        status: EntryStatus,
        uploaded_as: Option<String>,
        error: Option<&ImportError>,
    ) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            status,
            uploaded_as,
            error_kind: error.map(ImportError::kind),
            error_message: error.map(ToString::to_string),
        }
    }
}

/// Progress after an entry has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Whole percentage, rounded down; an empty run is complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.processed.min(self.total) * 100 / self.total) as u8
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub state: RunState,
    pub total_selected: usize,
    pub succeeded: usize,
    pub skipped_duplicate: usize,
    pub ignored: usize,
    pub failed: usize,
    /// Set when the run was stopped between entries.
    pub cancelled: bool,
    pub entries: Vec<EntryOutcome>,
    /// Diagnostic lines, empty unless verbose logs are enabled.
    pub diagnostics: Vec<String>,
}

impl ImportReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} uploaded, {} skipped, {} failed of {} selected",
            self.succeeded, self.skipped_duplicate, self.failed, self.total_selected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down() {
        let p = |processed, total| Progress { processed, total }.percent();
        assert_eq!(p(0, 3), 0);
        assert_eq!(p(1, 3), 33);
        assert_eq!(p(2, 3), 66);
        assert_eq!(p(3, 3), 100);
        assert_eq!(p(0, 0), 100);
    }

    #[test]
    fn failed_outcome_carries_error() {
        let err = ImportError::Decode("bad header".into());
        let outcome = EntryOutcome::failed("a.png", "img/a.png", &err);
        assert_eq!(outcome.status, EntryStatus::Failed);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Decode));
        assert_eq!(outcome.error_message.as_deref(), Some("cannot decode image: bad header"));
    }
}
