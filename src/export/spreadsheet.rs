//! Spreadsheet export of raw and aggregated measurements as CSV.
//!
//! # Output Files
//!
//! - `overview.csv`: one row per measured request, in record order.
//! - `histogram.csv`: one row per configuration with its statistics.

use std::io::Write;
use std::path::PathBuf;

use csv::{Writer, WriterBuilder};

use super::{ExportError, OutputSink};
use crate::harness::{AggregateRecord, RunContainer, TimingRecord};

pub const OVERVIEW_FILE: &str = "overview.csv";
pub const AGGREGATES_FILE: &str = "histogram.csv";

pub const OVERVIEW_HEADER: [&str; 6] = [
    "Iteration",
    "Test Case",
    "Preparation Time (ms)",
    "Execution Time (ms)",
    "Request String",
    "Response String",
];

pub const AGGREGATES_HEADER: [&str; 5] = [
    "Test Case",
    "Minimum Time (ms)",
    "Maximum Time (ms)",
    "Average Time (ms)",
    "Median Time (ms)",
];

fn writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new().has_headers(false).from_writer(out)
}

pub fn write_records<W: Write>(out: W, records: &[TimingRecord]) -> csv::Result<()> {
    let mut wtr = writer(out);
    wtr.write_record(OVERVIEW_HEADER)?;
    for r in records {
        wtr.write_record([
            r.sequence.to_string().as_str(),
            r.configuration.as_str(),
            r.preparation_ms.to_string().as_str(),
            r.execution_ms.to_string().as_str(),
            r.request.as_str(),
            r.decision.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_aggregates<W: Write>(out: W, aggregates: &[AggregateRecord]) -> csv::Result<()> {
    let mut wtr = writer(out);
    wtr.write_record(AGGREGATES_HEADER)?;
    for a in aggregates {
        wtr.write_record([
            a.configuration.as_str(),
            a.min_ms.to_string().as_str(),
            a.max_ms.to_string().as_str(),
            a.mean_ms.to_string().as_str(),
            a.median_ms.to_string().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `overview.csv` and `histogram.csv` into a run directory.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_file(
        &self,
        file: &str,
        body: impl FnOnce(std::fs::File) -> csv::Result<()>,
    ) -> Result<(), ExportError> {
        let path = self.dir.join(file);
        std::fs::File::create(&path)
            .map_err(csv::Error::from)
            .and_then(body)
            .map_err(|source| ExportError::Csv { path, source })
    }
}

impl OutputSink for CsvExporter {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    fn publish(&mut self, run: &RunContainer) -> Result<(), ExportError> {
        self.write_file(OVERVIEW_FILE, |out| write_records(out, run.records()))?;
        self.write_file(AGGREGATES_FILE, |out| {
            write_aggregates(out, run.aggregate_data())
        })
    }
}
