//! Measurement loop for a single benchmark configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use super::records::TimingRecord;
use crate::engine::policy::SETTINGS_FILE;
use crate::engine::{EngineGateway, IndexStrategy};
use crate::error::BenchError;
use crate::observability::{as_millis_f64, record_decision, record_engine_construction};
use crate::suite::{BenchmarkConfiguration, PolicyGenerator};

/// Runs the outer/inner repetition loop of one configuration against
/// engines built by `gateway`.
///
/// Namespaces live directly below `base`, next to the shared engine
/// settings file `base/pdp.json`.
pub struct WorkloadDriver<'a> {
    gateway: &'a dyn EngineGateway,
    base: PathBuf,
    index: IndexStrategy,
}

impl<'a> WorkloadDriver<'a> {
    pub fn new(gateway: &'a dyn EngineGateway, base: impl Into<PathBuf>, index: IndexStrategy) -> Self {
        Self {
            gateway,
            base: base.into(),
            index,
        }
    }

    pub fn index(&self) -> IndexStrategy {
        self.index
    }

    pub fn namespace_for(&self, config: &BenchmarkConfiguration) -> PathBuf {
        self.base.join(config.namespace())
    }

    /// Materialize a fresh policy set for `config` and copy the shared
    /// engine settings next to it.
    pub fn prepare_namespace(&self, config: &BenchmarkConfiguration) -> Result<PathBuf, BenchError> {
        let namespace = self.namespace_for(config);
        let prepare = |namespace: &Path| -> std::io::Result<usize> {
            let written = PolicyGenerator::new(&config.params).generate_policies(namespace)?;
            fs::copy(self.base.join(SETTINGS_FILE), namespace.join(SETTINGS_FILE))?;
            Ok(written)
        };

        let written = prepare(&namespace).map_err(|source| BenchError::NamespacePreparation {
            configuration: config.name.clone(),
            namespace: namespace.clone(),
            source,
        })?;
        info!(
            configuration = %config.name,
            namespace = %namespace.display(),
            policies = written,
            "Prepared policy namespace"
        );
        Ok(namespace)
    }

    /// Benchmark one configuration.
    ///
    /// Each outer iteration constructs a fresh engine (timed as the
    /// preparation duration shared by that iteration's records), fires
    /// `runs` requests at it and releases it. Records come back in sequence
    /// order `inner + outer * runs`. The first failure ends the loop.
    pub fn run_workload(
        &self,
        config: &BenchmarkConfiguration,
        iterations: usize,
        runs: usize,
        reuse_existing: bool,
    ) -> Result<Vec<TimingRecord>, BenchError> {
        let namespace = if reuse_existing {
            self.namespace_for(config)
        } else {
            self.prepare_namespace(config)?
        };

        let mut generator = PolicyGenerator::new(&config.params);
        let mut records = Vec::with_capacity(iterations * runs);

        for outer in 0..iterations {
            let begin = Instant::now();
            let mut engine = self
                .gateway
                .construct(&namespace, self.index)
                .map_err(|source| BenchError::EngineConstruction {
                    configuration: config.name.clone(),
                    iteration: outer,
                    source,
                })?;
            let prep = begin.elapsed();
            record_engine_construction(self.index, prep);
            let preparation_ms = as_millis_f64(prep);

            for inner in 0..runs {
                let sequence = inner + outer * runs;
                let request = generator.create_request();

                let start = Instant::now();
                let outcome = engine.decide(&request);
                let elapsed = start.elapsed();

                let decision = outcome
                    .map_err(|source| BenchError::DecisionEvaluation {
                        configuration: config.name.clone(),
                        sequence,
                        source,
                    })?
                    .ok_or_else(|| BenchError::MissingDecision {
                        configuration: config.name.clone(),
                        sequence,
                    })?;
                record_decision(self.index, decision, elapsed);

                let execution_ms = as_millis_f64(elapsed);
                debug!(
                    configuration = %config.name,
                    sequence,
                    prep_ms = preparation_ms,
                    exec_ms = execution_ms,
                    "Decision measured"
                );
                records.push(TimingRecord {
                    sequence,
                    configuration: config.name.clone(),
                    preparation_ms,
                    execution_ms,
                    request: request.to_string(),
                    decision: decision.to_string(),
                });
            }

            // Release before the next iteration builds its replacement.
            drop(engine);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Decision, EmbeddedGateway, StubGateway};
    use crate::suite::WorkloadParams;

    fn config(name: &str) -> BenchmarkConfiguration {
        BenchmarkConfiguration::new(
            name,
            WorkloadParams {
                policy_count: 20,
                ..WorkloadParams::default()
            },
        )
    }

    fn base_with_settings() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{"algorithm":"DENY_OVERRIDES"}"#).unwrap();
        dir
    }

    #[test]
    fn test_sequence_and_preparation_layout() {
        let dir = base_with_settings();
        let gateway = StubGateway::new();
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast);

        let records = driver.run_workload(&config("A"), 2, 3, false).unwrap();

        let sequences: Vec<usize> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5]);
        assert!(records[..3].iter().all(|r| r.preparation_ms == records[0].preparation_ms));
        assert!(records[3..].iter().all(|r| r.preparation_ms == records[3].preparation_ms));
        assert!(records.iter().all(|r| r.configuration == "A"));
        assert!(records.iter().all(|r| r.decision == "PERMIT"));
    }

    #[test]
    fn test_engine_rebuilt_and_released_per_iteration() {
        let dir = base_with_settings();
        let gateway = StubGateway::new();
        let counters = gateway.counters();
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Simple);

        driver.run_workload(&config("A"), 4, 2, false).unwrap();

        assert_eq!(counters.constructed(), 4);
        assert_eq!(counters.disposed(), 4);
        assert_eq!(counters.decisions(), 8);
    }

    #[test]
    fn test_missing_decision_is_fatal_and_engine_released() {
        let dir = base_with_settings();
        let gateway = StubGateway::new().without_decisions();
        let counters = gateway.counters();
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast);

        let err = driver.run_workload(&config("A"), 3, 2, false).unwrap_err();

        assert!(matches!(err, BenchError::MissingDecision { sequence: 0, .. }));
        assert_eq!(counters.constructed(), 1);
        assert_eq!(counters.disposed(), 1);
    }

    #[test]
    fn test_construct_failure_names_configuration() {
        let dir = base_with_settings();
        let gateway = StubGateway::new().failing_construct_for("brokencase");
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast);

        let err = driver.run_workload(&config("broken case"), 1, 1, false).unwrap_err();
        assert_eq!(err.configuration(), Some("broken case"));
        assert_eq!(err.phase(), "construct");
    }

    #[test]
    fn test_missing_shared_settings_fails_preparation() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let counters = gateway.counters();
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast);

        let err = driver.run_workload(&config("A"), 1, 1, false).unwrap_err();
        assert!(matches!(err, BenchError::NamespacePreparation { .. }));
        assert_eq!(counters.constructed(), 0);
    }

    #[test]
    fn test_reuse_skips_materialization() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let driver = WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast);

        // No settings file and no namespace: only the stub constructs.
        let records = driver.run_workload(&config("A"), 1, 2, true).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!dir.path().join("A").exists());
    }

    #[test]
    fn test_embedded_engine_end_to_end() {
        let dir = base_with_settings();
        let driver = WorkloadDriver::new(&EmbeddedGateway, dir.path(), IndexStrategy::Improved);

        let records = driver.run_workload(&config("small set"), 2, 5, false).unwrap();

        assert_eq!(records.len(), 10);
        assert!(dir.path().join("smallset").join(SETTINGS_FILE).exists());
        let known = [Decision::Permit, Decision::Deny, Decision::NotApplicable].map(|d| d.to_string());
        assert!(records.iter().all(|r| known.contains(&r.decision)));
        assert!(records[0].request.contains("\"subject\""));
    }
}
