pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod harness;
pub mod logging;
pub mod observability;
pub mod suite;

#[cfg(feature = "benchmarks")]
pub mod benchmarks;

pub use config::*;
pub use error::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tracing::info;

use crate::engine::policy::{EngineSettings, SETTINGS_FILE};
use crate::engine::{EmbeddedGateway, EngineGateway, IndexStrategy, StubGateway};
use crate::export::persistence::RESULTS_FILE;
use crate::export::{
    ChartRenderer, CsvExporter, JsonLinesRepository, OutputSink, PersistenceSink, publish_all,
};
use crate::harness::{BenchmarkOrchestrator, RunContainer, RunParameters, WorkloadDriver};
use crate::suite::{GeneratedSuite, JsonSuiteFile, TestCaseProvider};

/// Run identifier: local start time plus the index strategy.
pub fn run_id(index: IndexStrategy) -> String {
    format!("{}_{}", Local::now().format("%Y-%m-%dT%H-%M-%S"), index)
}

/// Write a default `pdp.json` into `base` unless one exists.
pub fn ensure_engine_settings(base: &Path) -> Result<PathBuf, BenchError> {
    let path = base.join(SETTINGS_FILE);
    if path.exists() {
        return Ok(path);
    }
    let settings = serde_json::to_string_pretty(&EngineSettings::default())
        .map_err(|e| BenchError::Precondition(format!("cannot encode engine settings: {e}")))?;
    fs::write(&path, settings).map_err(|e| {
        BenchError::Precondition(format!("cannot write {}: {e}", path.display()))
    })?;
    info!(path = %path.display(), "Wrote default engine settings");
    Ok(path)
}

pub fn test_case_provider(config: &BenchConfig) -> Box<dyn TestCaseProvider> {
    match &config.run.suite {
        Some(path) => Box::new(JsonSuiteFile::new(path)),
        None => Box::new(GeneratedSuite::new(config.run.seed)),
    }
}

pub fn engine_gateway(config: &EngineConfig) -> Box<dyn EngineGateway> {
    match config.kind {
        EngineKind::Embedded => Box::new(EmbeddedGateway),
        EngineKind::Stub => Box::new(
            StubGateway::new()
                .with_construct_delay(Duration::from_millis(config.stub_construct_ms))
                .with_decide_delay(Duration::from_millis(config.stub_decide_ms)),
        ),
    }
}

/// Spreadsheet, chart and result-store sinks writing into `run_dir`.
pub fn default_sinks(run_dir: &Path) -> Vec<Box<dyn OutputSink>> {
    vec![
        Box::new(CsvExporter::new(run_dir)),
        Box::new(ChartRenderer::new(run_dir)),
        Box::new(PersistenceSink::new(JsonLinesRepository::new(
            run_dir.join(RESULTS_FILE),
        ))),
    ]
}

/// Benchmark every configuration of the selected suite and publish the
/// results into `<output.path>/<run id>/`.
pub fn run_benchmark(config: &BenchConfig) -> Result<RunContainer, BenchError> {
    let gateway = engine_gateway(&config.engine);
    run_benchmark_with(config, gateway.as_ref())
}

pub fn run_benchmark_with(
    config: &BenchConfig,
    gateway: &dyn EngineGateway,
) -> Result<RunContainer, BenchError> {
    let base = PathBuf::from(&config.output.path);
    if !base.is_dir() {
        return Err(BenchError::Precondition(format!(
            "output path {} is not a directory",
            base.display()
        )));
    }

    let suite = test_case_provider(config).test_suite()?;
    if !config.run.reuse {
        ensure_engine_settings(&base)?;
    }

    let run_id = run_id(config.run.index);
    let run_dir = base.join(&run_id);
    fs::create_dir_all(&run_dir).map_err(|e| {
        BenchError::Precondition(format!("cannot create {}: {e}", run_dir.display()))
    })?;

    let driver = WorkloadDriver::new(gateway, &base, config.run.index);
    let params = RunParameters {
        run_id,
        iterations: config.run.iterations,
        runs: config.run.runs,
        reuse_existing: config.run.reuse,
    };
    let mut sinks = default_sinks(&run_dir);
    let run = BenchmarkOrchestrator::new(driver).run_all_with(&suite.cases, &params, &mut sinks)?;

    publish_all(&run, &mut sinks)?;
    info!(
        run_id = %run.run_id(),
        output = %run_dir.display(),
        configurations = run.identifiers().len(),
        "Results published"
    );
    Ok(run)
}
