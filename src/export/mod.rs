//! Output sinks consuming a finished run.
//!
//! Sinks receive the [`RunContainer`] by shared reference only. They run
//! after all measurement is complete, so a failing sink never affects the
//! recorded timings.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::error::BenchError;
use crate::harness::RunContainer;

pub mod chart;
pub mod persistence;
pub mod spreadsheet;

pub use chart::ChartRenderer;
pub use persistence::{
    BenchmarkResultRow, InMemoryRepository, JsonLinesRepository, PersistenceSink, ResultRepository,
};
pub use spreadsheet::CsvExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Cannot render chart {}: {reason}", .path.display())]
    Chart { path: PathBuf, reason: String },

    #[error("Cannot serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}

pub trait OutputSink {
    fn name(&self) -> &str;

    /// Called right after `configuration` was recorded in `run`, while later
    /// configurations are still pending. Output written here stays on disk
    /// even if the run aborts afterwards.
    fn configuration_completed(
        &mut self,
        _run: &RunContainer,
        _configuration: &str,
    ) -> Result<(), ExportError> {
        Ok(())
    }

    /// Called once with the finished run.
    fn publish(&mut self, run: &RunContainer) -> Result<(), ExportError>;
}

/// Hand `run` to every sink.
///
/// All sinks are attempted even if one fails; each failure is logged and
/// the first one is returned.
pub fn publish_all(run: &RunContainer, sinks: &mut [Box<dyn OutputSink>]) -> Result<(), BenchError> {
    let mut first_failure = None;
    for sink in sinks.iter_mut() {
        match sink.publish(run) {
            Ok(()) => info!(sink = sink.name(), run_id = run.run_id(), "Results exported"),
            Err(e) => {
                error!(sink = sink.name(), phase = "export", error = %e, "Export failed");
                first_failure.get_or_insert(e);
            }
        }
    }
    match first_failure {
        Some(e) => Err(BenchError::Export(e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexStrategy;
    use std::io;

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn publish(&mut self, _run: &RunContainer) -> Result<(), ExportError> {
            Err(ExportError::io("/nowhere", io::Error::other("disk full")))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        calls: usize,
    }

    impl OutputSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        fn publish(&mut self, _run: &RunContainer) -> Result<(), ExportError> {
            self.calls += 1;
            Ok(())
        }
    }

    #[test]
    fn test_failure_does_not_skip_later_sinks() {
        let run = RunContainer::new("r", IndexStrategy::Fast, false, 1, 1);
        let dir = tempfile::tempdir().unwrap();
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![
            Box::new(FailingSink),
            Box::new(CsvExporter::new(dir.path())),
        ];

        let err = publish_all(&run, &mut sinks).unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert_eq!(err.phase(), "export");
        assert!(dir.path().join(spreadsheet::OVERVIEW_FILE).exists());
    }

    #[test]
    fn test_all_sinks_succeed() {
        let run = RunContainer::new("r", IndexStrategy::Fast, false, 1, 1);
        let mut sinks: Vec<Box<dyn OutputSink>> =
            vec![Box::new(CountingSink::default()), Box::new(CountingSink::default())];
        assert!(publish_all(&run, &mut sinks).is_ok());
    }
}
