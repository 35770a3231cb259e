use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::export::ExportError;
use crate::harness::statistics::StatisticsError;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Cannot prepare namespace {} for configuration '{configuration}': {source}", .namespace.display())]
    NamespacePreparation {
        configuration: String,
        namespace: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine construction failed for configuration '{configuration}' in iteration {iteration}: {source}")]
    EngineConstruction {
        configuration: String,
        iteration: usize,
        #[source]
        source: EngineError,
    },

    #[error("Decision evaluation failed for configuration '{configuration}' at request {sequence}: {source}")]
    DecisionEvaluation {
        configuration: String,
        sequence: usize,
        #[source]
        source: EngineError,
    },

    #[error("Engine returned no decision for configuration '{configuration}' at request {sequence}")]
    MissingDecision { configuration: String, sequence: usize },

    #[error("Statistics unavailable for configuration '{configuration}': {source}")]
    Statistics {
        configuration: String,
        #[source]
        source: StatisticsError,
    },

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

impl BenchError {
    /// Name of the configuration being benchmarked when the error occurred.
    pub fn configuration(&self) -> Option<&str> {
        match self {
            BenchError::NamespacePreparation { configuration, .. }
            | BenchError::EngineConstruction { configuration, .. }
            | BenchError::DecisionEvaluation { configuration, .. }
            | BenchError::MissingDecision { configuration, .. }
            | BenchError::Statistics { configuration, .. } => Some(configuration),
            BenchError::Config(_) | BenchError::Precondition(_) | BenchError::Export(_) => None,
        }
    }

    /// Phase of the run in which the error occurred, used as a log field.
    pub fn phase(&self) -> &'static str {
        match self {
            BenchError::Config(_) | BenchError::Precondition(_) => "startup",
            BenchError::NamespacePreparation { .. } => "namespace",
            BenchError::EngineConstruction { .. } => "construct",
            BenchError::DecisionEvaluation { .. } | BenchError::MissingDecision { .. } => "decide",
            BenchError::Statistics { .. } => "aggregate",
            BenchError::Export(_) => "export",
        }
    }
}

impl From<garde::Report> for BenchError {
    fn from(report: garde::Report) -> Self {
        BenchError::Config(report.to_string())
    }
}

impl From<figment::Error> for BenchError {
    fn from(err: figment::Error) -> Self {
        BenchError::Config(err.to_string())
    }
}
