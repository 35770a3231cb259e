//! The benchmark harness proper.
//!
//! Data flows one way: configurations go through the [`driver`], which
//! produces [`records::TimingRecord`]s; the [`orchestrator`] reduces each
//! configuration's execution durations with [`statistics`] and collects
//! everything in a [`records::RunContainer`] for the output sinks.
//!
//! Execution is strictly sequential. A configuration is finished before the
//! next one starts, and within a configuration one engine instance is built,
//! used and released before the next is built.

pub mod driver;
pub mod orchestrator;
pub mod records;
pub mod statistics;

pub use driver::WorkloadDriver;
pub use orchestrator::{BenchmarkOrchestrator, RunParameters};
pub use records::{AggregateRecord, RunContainer, TimingRecord};
pub use statistics::Summary;
