//! Benchmark configurations and the providers that supply them.
//!
//! A suite is either read from a JSON file of the form
//! `{"cases": [{"name": "...", "policy_count": 100, ...}]}` or generated
//! deterministically from a seed.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BenchError;

pub mod generator;

pub use generator::PolicyGenerator;

/// Parameters shaping the generated policy set and request stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadParams {
    pub policy_count: usize,
    pub subject_pool: usize,
    pub action_pool: usize,
    pub resource_pool: usize,
    /// Chance that a policy leaves a target attribute unconstrained.
    pub wildcard_probability: f64,
    /// Chance that a policy denies instead of permits.
    pub deny_probability: f64,
    pub seed: u64,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            policy_count: 100,
            subject_pool: 10,
            action_pool: 4,
            resource_pool: 20,
            wildcard_probability: 0.2,
            deny_probability: 0.3,
            seed: 0,
        }
    }
}

/// One named benchmark scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfiguration {
    pub name: String,
    #[serde(flatten)]
    pub params: WorkloadParams,
}

impl BenchmarkConfiguration {
    pub fn new(name: impl Into<String>, params: WorkloadParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Directory name of this configuration's policy namespace.
    pub fn namespace(&self) -> String {
        sanitize_name(&self.name)
    }
}

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex =
        Regex::new(r"[^a-zA-Z0-9]").expect("Valid pattern - compile time constant");
}

/// Strip every character outside `[a-zA-Z0-9]`.
pub fn sanitize_name(name: &str) -> String {
    NON_ALPHANUMERIC.replace_all(name, "").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub cases: Vec<BenchmarkConfiguration>,
}

/// Reject configurations the harness cannot run: an empty list, unusable
/// or colliding names and namespaces, and out-of-range workload parameters.
pub fn validate_configurations(cases: &[BenchmarkConfiguration]) -> Result<(), BenchError> {
    if cases.is_empty() {
        return Err(BenchError::Precondition(
            "at least one test case must be present".to_string(),
        ));
    }

    let mut seen: HashMap<String, &str> = HashMap::new();
    for case in cases {
        let namespace = case.namespace();
        if namespace.is_empty() {
            return Err(BenchError::Precondition(format!(
                "test case name '{}' has no alphanumeric characters",
                case.name
            )));
        }
        if let Some(other) = seen.insert(namespace.clone(), &case.name) {
            return Err(BenchError::Precondition(format!(
                "test cases '{other}' and '{}' share namespace '{namespace}'",
                case.name
            )));
        }

        let p = &case.params;
        if p.subject_pool == 0 || p.action_pool == 0 || p.resource_pool == 0 {
            return Err(BenchError::Precondition(format!(
                "test case '{}' needs non-empty subject, action and resource pools",
                case.name
            )));
        }
        for (field, value) in [
            ("wildcard_probability", p.wildcard_probability),
            ("deny_probability", p.deny_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BenchError::Precondition(format!(
                    "test case '{}' has {field} {value} outside [0, 1]",
                    case.name
                )));
            }
        }
    }
    Ok(())
}

impl TestSuite {
    pub fn validate(&self) -> Result<(), BenchError> {
        validate_configurations(&self.cases)
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Source of the ordered configurations of a run.
pub trait TestCaseProvider {
    fn test_suite(&self) -> Result<TestSuite, BenchError>;
}

/// Reads a suite from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSuiteFile {
    path: PathBuf,
}

impl JsonSuiteFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TestCaseProvider for JsonSuiteFile {
    fn test_suite(&self) -> Result<TestSuite, BenchError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            BenchError::Precondition(format!(
                "cannot read test suite {}: {e}",
                self.path.display()
            ))
        })?;
        let suite: TestSuite = serde_json::from_str(&raw).map_err(|e| {
            BenchError::Precondition(format!(
                "invalid test suite {}: {e}",
                self.path.display()
            ))
        })?;
        suite.validate()?;
        info!(path = %self.path.display(), cases = suite.cases.len(), "Loaded test suite");
        Ok(suite)
    }
}

/// Built-in suite: growing policy sets over a small and a large attribute
/// space.
#[derive(Debug, Clone)]
pub struct GeneratedSuite {
    seed: u64,
}

const GENERATED_POLICY_COUNTS: [usize; 4] = [10, 100, 500, 1000];

impl GeneratedSuite {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl TestCaseProvider for GeneratedSuite {
    fn test_suite(&self) -> Result<TestSuite, BenchError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut cases = Vec::new();
        for (label, subject_pool, resource_pool) in [("narrow", 10, 20), ("wide", 200, 1000)] {
            for policy_count in GENERATED_POLICY_COUNTS {
                let params = WorkloadParams {
                    policy_count,
                    subject_pool,
                    action_pool: 4,
                    resource_pool,
                    wildcard_probability: 0.2,
                    deny_probability: 0.3,
                    seed: rng.gen_range(0..u64::MAX),
                };
                cases.push(BenchmarkConfiguration::new(
                    format!("{label} {policy_count} policies"),
                    params,
                ));
            }
        }

        let suite = TestSuite { cases };
        suite.validate()?;
        info!(seed = self.seed, cases = suite.cases.len(), "Generated test suite");
        Ok(suite)
    }
}
