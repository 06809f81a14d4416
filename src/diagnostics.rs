use chrono::Utc;
use tracing::debug;

/// Per-run diagnostic buffer.
///
/// When enabled, every pipeline action is kept as a `[<unix millis>] message`
/// line so the caller can show or save the trace after the run. When
/// disabled, nothing is kept.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    enabled: bool,
    lines: Vec<String>,
}

impl DiagnosticLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, message: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let message = message.as_ref();
        debug!("{}", message);
        self.lines
            .push(format!("[{}] {}", Utc::now().timestamp_millis(), message));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_keeps_nothing() {
        let mut log = DiagnosticLog::new(false);
        log.record("Starting import");
        assert!(log.lines().is_empty());
    }

    #[test]
    fn lines_are_timestamped() {
        let mut log = DiagnosticLog::new(true);
        log.record("Starting import");

        let line = &log.lines()[0];
        let (stamp, message) = line.split_once("] ").unwrap();
        assert!(stamp.trim_start_matches('[').parse::<i64>().unwrap() > 0);
        assert_eq!(message, "Starting import");
    }
}
