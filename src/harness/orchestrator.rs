//! Sequential benchmarking of a whole suite into one [`RunContainer`].

use tracing::{error, info};

use super::driver::WorkloadDriver;
use super::records::RunContainer;
use super::statistics::Summary;
use crate::error::BenchError;
use crate::export::OutputSink;
use crate::observability::record_configuration_completed;
use crate::suite::{BenchmarkConfiguration, validate_configurations};

/// Run-scoped parameters handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub run_id: String,
    pub iterations: usize,
    pub runs: usize,
    pub reuse_existing: bool,
}

/// Benchmarks every configuration in order and reduces the results.
pub struct BenchmarkOrchestrator<'a> {
    driver: WorkloadDriver<'a>,
}

impl<'a> BenchmarkOrchestrator<'a> {
    pub fn new(driver: WorkloadDriver<'a>) -> Self {
        Self { driver }
    }

    /// Benchmark `configurations` strictly one after another.
    ///
    /// The first failing configuration aborts the whole run: no aggregate
    /// data is built and the error, naming that configuration, is returned.
    pub fn run_all(
        &self,
        configurations: &[BenchmarkConfiguration],
        params: &RunParameters,
    ) -> Result<RunContainer, BenchError> {
        self.run_all_with(configurations, params, &mut [])
    }

    /// Like [`run_all`](Self::run_all), handing every completed
    /// configuration to `sinks` before the next one starts.
    pub fn run_all_with(
        &self,
        configurations: &[BenchmarkConfiguration],
        params: &RunParameters,
        sinks: &mut [Box<dyn OutputSink>],
    ) -> Result<RunContainer, BenchError> {
        validate_configurations(configurations).inspect_err(|e| log_failure(e))?;
        if params.iterations == 0 || params.runs == 0 {
            return Err(BenchError::Precondition(format!(
                "iterations ({}) and runs ({}) must both be positive",
                params.iterations, params.runs
            )));
        }

        let index = self.driver.index();
        let mut container = RunContainer::new(
            params.run_id.clone(),
            index,
            params.reuse_existing,
            params.iterations,
            params.runs,
        );

        info!(
            run_id = %params.run_id,
            index = %index,
            reuse = params.reuse_existing,
            iterations = params.iterations,
            runs = params.runs,
            configurations = configurations.len(),
            "Starting benchmark run"
        );

        for config in configurations {
            let records = self
                .driver
                .run_workload(config, params.iterations, params.runs, params.reuse_existing)
                .inspect_err(|e| log_failure(e))?;

            let samples: Vec<f64> = records.iter().map(|r| r.execution_ms).collect();
            let summary = Summary::from_samples(&samples)
                .map_err(|source| BenchError::Statistics {
                    configuration: config.name.clone(),
                    source,
                })
                .inspect_err(|e| log_failure(e))?;

            info!(
                configuration = %config.name,
                samples = samples.len(),
                min_ms = summary.min,
                max_ms = summary.max,
                mean_ms = summary.mean,
                median_ms = summary.median,
                "Configuration benchmarked"
            );
            record_configuration_completed(index);
            container.record_configuration(config.name.clone(), records, summary);

            for sink in sinks.iter_mut() {
                sink.configuration_completed(&container, &config.name)
                    .map_err(BenchError::Export)
                    .inspect_err(|e| {
                        error!(
                            configuration = %config.name,
                            sink = sink.name(),
                            phase = e.phase(),
                            error = %e,
                            "Benchmark run aborted"
                        )
                    })?;
            }
        }

        container.build_aggregate_data();
        info!(
            run_id = %params.run_id,
            aggregates = container.aggregate_data().len(),
            records = container.records().len(),
            "Benchmark run complete"
        );
        Ok(container)
    }
}

fn log_failure(err: &BenchError) {
    error!(
        configuration = err.configuration().unwrap_or("-"),
        phase = err.phase(),
        error = %err,
        "Benchmark run aborted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{IndexStrategy, StubGateway};
    use crate::suite::WorkloadParams;

    fn configs(names: &[&str]) -> Vec<BenchmarkConfiguration> {
        names
            .iter()
            .map(|n| BenchmarkConfiguration::new(*n, WorkloadParams::default()))
            .collect()
    }

    fn params(iterations: usize, runs: usize) -> RunParameters {
        RunParameters {
            run_id: "test_FAST".to_string(),
            iterations,
            runs,
            // Stub engines need no materialized policies.
            reuse_existing: true,
        }
    }

    #[test]
    fn test_identifiers_follow_configuration_order() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));

        let container = orchestrator
            .run_all(&configs(&["A", "B", "C"]), &params(2, 3))
            .unwrap();

        assert_eq!(container.identifiers(), ["A", "B", "C"]);
        assert_eq!(container.min_values().len(), 3);
        assert_eq!(container.max_values().len(), 3);
        assert_eq!(container.avg_values().len(), 3);
        assert_eq!(container.mdn_values().len(), 3);
        assert_eq!(container.records().len(), 18);
        let names: Vec<&str> = container
            .aggregate_data()
            .iter()
            .map(|a| a.configuration.as_str())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(container.run_id(), "test_FAST");
        assert_eq!(container.index(), IndexStrategy::Fast);
    }

    #[test]
    fn test_construct_failure_aborts_whole_run() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new().failing_construct_for("B");
        let counters = gateway.counters();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));

        let err = orchestrator
            .run_all(&configs(&["A", "B", "C"]), &params(1, 2))
            .unwrap_err();

        assert_eq!(err.configuration(), Some("B"));
        // A ran, C never started.
        assert_eq!(counters.constructed(), 1);
        assert_eq!(counters.decisions(), 2);
    }

    #[test]
    fn test_preconditions_checked_before_measuring() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let counters = gateway.counters();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));

        let err = orchestrator.run_all(&[], &params(1, 1)).unwrap_err();
        assert!(matches!(err, BenchError::Precondition(_)));

        let err = orchestrator.run_all(&configs(&["A"]), &params(1, 0)).unwrap_err();
        assert!(matches!(err, BenchError::Precondition(_)));
        assert_eq!(counters.constructed(), 0);
    }

    #[test]
    fn test_runs_are_structurally_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));
        let suite = configs(&["A", "B"]);

        let first = orchestrator.run_all(&suite, &params(2, 2)).unwrap();
        let second = orchestrator.run_all(&suite, &params(2, 2)).unwrap();

        assert_eq!(first.identifiers(), second.identifiers());
        let strip = |c: &RunContainer| -> Vec<(usize, String, String, String)> {
            c.records()
                .iter()
                .map(|r| (r.sequence, r.configuration.clone(), r.request.clone(), r.decision.clone()))
                .collect()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_abort_is_logged_with_configuration_and_phase() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new().without_decisions();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));

        let err = orchestrator.run_all(&configs(&["Only"]), &params(1, 1)).unwrap_err();

        assert_eq!(err.phase(), "decide");
        assert!(logs_contain("Benchmark run aborted"));
        assert!(logs_contain("configuration=\"Only\""));
        assert!(logs_contain("phase=\"decide\""));
    }

    #[test]
    fn test_duplicate_names_rejected_before_measuring() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let counters = gateway.counters();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));

        let err = orchestrator.run_all(&configs(&["A", "A"]), &params(1, 2)).unwrap_err();

        assert!(matches!(err, BenchError::Precondition(_)));
        assert_eq!(counters.constructed(), 0);
    }

    #[test]
    fn test_name_without_namespace_leaves_shared_settings_intact() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join(crate::engine::policy::SETTINGS_FILE);
        std::fs::write(&settings, r#"{"algorithm":"DENY_OVERRIDES"}"#).unwrap();
        let gateway = StubGateway::new();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));
        let run = RunParameters {
            reuse_existing: false,
            ..params(1, 1)
        };

        let err = orchestrator.run_all(&configs(&["A", "--"]), &run).unwrap_err();

        assert!(matches!(err, BenchError::Precondition(_)));
        assert_eq!(
            std::fs::read_to_string(&settings).unwrap(),
            r#"{"algorithm":"DENY_OVERRIDES"}"#
        );
        assert!(!dir.path().join("A").exists());
    }

    #[test]
    fn test_empty_attribute_pool_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new();
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));
        let suite = [BenchmarkConfiguration::new(
            "A",
            WorkloadParams {
                subject_pool: 0,
                ..WorkloadParams::default()
            },
        )];

        let err = orchestrator.run_all(&suite, &params(1, 1)).unwrap_err();

        assert!(matches!(err, BenchError::Precondition(_)));
        assert!(err.to_string().contains("pools"));
    }

    #[derive(Default)]
    struct CompletionLog {
        seen: std::rc::Rc<std::cell::RefCell<Vec<(String, usize)>>>,
    }

    impl OutputSink for CompletionLog {
        fn name(&self) -> &str {
            "completion-log"
        }

        fn configuration_completed(
            &mut self,
            run: &RunContainer,
            configuration: &str,
        ) -> Result<(), crate::export::ExportError> {
            self.seen
                .borrow_mut()
                .push((configuration.to_string(), run.identifiers().len()));
            Ok(())
        }

        fn publish(&mut self, _run: &RunContainer) -> Result<(), crate::export::ExportError> {
            Ok(())
        }
    }

    #[test]
    fn test_sinks_see_each_configuration_before_abort() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = StubGateway::new().failing_construct_for("B");
        let orchestrator =
            BenchmarkOrchestrator::new(WorkloadDriver::new(&gateway, dir.path(), IndexStrategy::Fast));
        let log = CompletionLog::default();
        let seen = std::rc::Rc::clone(&log.seen);
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(log)];

        let err = orchestrator
            .run_all_with(&configs(&["A", "B", "C"]), &params(1, 2), &mut sinks)
            .unwrap_err();

        assert_eq!(err.configuration(), Some("B"));
        assert_eq!(*seen.borrow(), vec![("A".to_string(), 1)]);
    }
}
