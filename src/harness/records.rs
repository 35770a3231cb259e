//! Measurement records and the run-scoped container that accumulates them.

use serde::Serialize;

use super::statistics::Summary;
use crate::engine::IndexStrategy;

/// One measured authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRecord {
    /// Position within the configuration, `inner + outer * runs`.
    pub sequence: usize,
    pub configuration: String,
    /// Engine construction time of the enclosing outer iteration.
    pub preparation_ms: f64,
    pub execution_ms: f64,
    pub request: String,
    pub decision: String,
}

/// Execution-time statistics of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub configuration: String,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
}

/// Accumulator for a whole benchmark run.
///
/// The per-configuration statistics are kept as index-aligned columns next
/// to `identifiers`. They can only be extended together through
/// [`RunContainer::record_configuration`], so `min_values()[i]` and its
/// siblings always describe the records of `identifiers()[i]`.
#[derive(Debug, Clone)]
pub struct RunContainer {
    run_id: String,
    index: IndexStrategy,
    reuse: bool,
    iterations: usize,
    runs: usize,
    identifiers: Vec<String>,
    records: Vec<TimingRecord>,
    min_values: Vec<f64>,
    max_values: Vec<f64>,
    avg_values: Vec<f64>,
    mdn_values: Vec<f64>,
    aggregate_data: Vec<AggregateRecord>,
}

impl RunContainer {
    pub fn new(
        run_id: impl Into<String>,
        index: IndexStrategy,
        reuse: bool,
        iterations: usize,
        runs: usize,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            index,
            reuse,
            iterations,
            runs,
            identifiers: Vec::new(),
            records: Vec::new(),
            min_values: Vec::new(),
            max_values: Vec::new(),
            avg_values: Vec::new(),
            mdn_values: Vec::new(),
            aggregate_data: Vec::new(),
        }
    }

    /// Append one finished configuration: its name, its records and the
    /// summary of their execution durations.
    pub fn record_configuration(
        &mut self,
        name: impl Into<String>,
        records: Vec<TimingRecord>,
        summary: Summary,
    ) {
        self.identifiers.push(name.into());
        self.min_values.push(summary.min);
        self.max_values.push(summary.max);
        self.avg_values.push(summary.mean);
        self.mdn_values.push(summary.median);
        self.records.extend(records);
    }

    /// Rebuild `aggregate_data` from the per-configuration columns.
    ///
    /// Replaces any previous aggregate list, so repeated calls yield the same
    /// result.
    pub fn build_aggregate_data(&mut self) {
        self.aggregate_data = self.aggregate_records();
    }

    /// Aggregate rows in configuration order, derived from the columns.
    pub fn aggregate_records(&self) -> Vec<AggregateRecord> {
        self.identifiers
            .iter()
            .enumerate()
            .map(|(i, name)| AggregateRecord {
                configuration: name.clone(),
                min_ms: self.min_values[i],
                max_ms: self.max_values[i],
                mean_ms: self.avg_values[i],
                median_ms: self.mdn_values[i],
            })
            .collect()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn index(&self) -> IndexStrategy {
        self.index
    }

    pub fn reuse(&self) -> bool {
        self.reuse
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    pub fn min_values(&self) -> &[f64] {
        &self.min_values
    }

    pub fn max_values(&self) -> &[f64] {
        &self.max_values
    }

    pub fn avg_values(&self) -> &[f64] {
        &self.avg_values
    }

    pub fn mdn_values(&self) -> &[f64] {
        &self.mdn_values
    }

    /// Empty until [`RunContainer::build_aggregate_data`] has run.
    pub fn aggregate_data(&self) -> &[AggregateRecord] {
        &self.aggregate_data
    }

    /// Execution durations of one configuration in sequence order.
    pub fn execution_series(&self, configuration: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.configuration == configuration)
            .map(|r| r.execution_ms)
            .collect()
    }
}
