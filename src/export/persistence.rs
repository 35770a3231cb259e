//! Storage of aggregate results together with their run metadata.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ExportError, OutputSink};
use crate::engine::IndexStrategy;
use crate::harness::{AggregateRecord, RunContainer};

pub const RESULTS_FILE: &str = "results.jsonl";

/// One stored result: an aggregate record plus the run it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResultRow {
    pub id: Uuid,
    pub run_id: String,
    pub index: IndexStrategy,
    pub reuse: bool,
    pub iterations: usize,
    pub runs: usize,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub mdn: f64,
    pub recorded_at: DateTime<Utc>,
}

impl BenchmarkResultRow {
    pub fn new(run: &RunContainer, aggregate: &AggregateRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id: run.run_id().to_string(),
            index: run.index(),
            reuse: run.reuse(),
            iterations: run.iterations(),
            runs: run.runs(),
            name: aggregate.configuration.clone(),
            min: aggregate.min_ms,
            max: aggregate.max_ms,
            avg: aggregate.mean_ms,
            mdn: aggregate.median_ms,
            recorded_at: Utc::now(),
        }
    }
}

pub trait ResultRepository {
    fn save(&mut self, row: &BenchmarkResultRow) -> Result<(), ExportError>;
}

/// Appends one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonLinesRepository {
    path: PathBuf,
}

impl JsonLinesRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ResultRepository for JsonLinesRepository {
    fn save(&mut self, row: &BenchmarkResultRow) -> Result<(), ExportError> {
        let line = serde_json::to_string(row).map_err(|source| ExportError::Serialize {
            what: "benchmark result",
            source,
        })?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"))
            .map_err(|e| ExportError::io(&self.path, e))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    rows: Vec<BenchmarkResultRow>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[BenchmarkResultRow] {
        &self.rows
    }
}

impl ResultRepository for InMemoryRepository {
    fn save(&mut self, row: &BenchmarkResultRow) -> Result<(), ExportError> {
        self.rows.push(row.clone());
        Ok(())
    }
}

/// Saves every aggregate record of a run as one row.
#[derive(Debug)]
pub struct PersistenceSink<R> {
    repository: R,
}

impl<R: ResultRepository> PersistenceSink<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R: ResultRepository> OutputSink for PersistenceSink<R> {
    fn name(&self) -> &str {
        "persistence"
    }

    fn publish(&mut self, run: &RunContainer) -> Result<(), ExportError> {
        for aggregate in run.aggregate_data() {
            self.repository.save(&BenchmarkResultRow::new(run, aggregate))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Summary, TimingRecord};
    use std::fs;

    fn finished_run() -> RunContainer {
        let mut run = RunContainer::new("2024_IMPROVED", IndexStrategy::Improved, true, 3, 4);
        for (name, ms) in [("A", 1.0), ("B", 2.0)] {
            let record = TimingRecord {
                sequence: 0,
                configuration: name.to_string(),
                preparation_ms: 0.5,
                execution_ms: ms,
                request: "{}".to_string(),
                decision: "PERMIT".to_string(),
            };
            run.record_configuration(name, vec![record], Summary::from_samples(&[ms]).unwrap());
        }
        run.build_aggregate_data();
        run
    }

    #[test]
    fn test_rows_carry_run_metadata() {
        let run = finished_run();
        let mut sink = PersistenceSink::new(InMemoryRepository::new());
        sink.publish(&run).unwrap();

        let rows = sink.repository().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "A");
        assert_eq!(rows[1].avg, 2.0);
        assert!(rows.iter().all(|r| r.index == IndexStrategy::Improved && r.reuse));
        assert!(rows.iter().all(|r| r.iterations == 3 && r.runs == 4));
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn test_json_lines_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        let run = finished_run();

        let mut sink = PersistenceSink::new(JsonLinesRepository::new(&path));
        sink.publish(&run).unwrap();
        sink.publish(&run).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<BenchmarkResultRow> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].run_id, "2024_IMPROVED");
        assert!(content.contains("\"index\":\"IMPROVED\""));
    }
}
