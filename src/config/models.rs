use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::engine::IndexStrategy;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
pub struct BenchConfig {
    #[garde(dive)]
    #[serde(default)]
    pub output: OutputConfig,

    #[garde(dive)]
    #[serde(default)]
    pub run: RunConfig,

    #[garde(dive)]
    #[serde(default)]
    pub engine: EngineConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OutputConfig {
    /// Directory holding policy namespaces, `pdp.json` and run directories.
    #[garde(length(min = 1), custom(validate_existing_dir))]
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    ".".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct RunConfig {
    /// Outer iterations: engine constructions per configuration.
    #[garde(range(min = 1, max = 10_000))]
    pub iterations: usize,

    /// Inner runs: requests per engine instance.
    #[garde(range(min = 1, max = 1_000_000))]
    pub runs: usize,

    /// Benchmark the policies already present instead of regenerating them.
    #[garde(skip)]
    pub reuse: bool,

    #[garde(skip)]
    pub index: IndexStrategy,

    /// JSON test suite; the built-in suite is used when absent.
    #[garde(skip)]
    pub suite: Option<String>,

    /// Seed of the built-in suite.
    #[garde(skip)]
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            runs: 30,
            reuse: false,
            index: IndexStrategy::Fast,
            suite: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Embedded,
    Stub,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct EngineConfig {
    #[garde(skip)]
    pub kind: EngineKind,

    #[garde(range(max = 60_000))]
    pub stub_construct_ms: u64,

    #[garde(range(max = 60_000))]
    pub stub_decide_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn validate_existing_dir(value: &str, _: &()) -> garde::Result {
    if std::path::Path::new(value).is_dir() {
        Ok(())
    } else {
        Err(garde::Error::new("path provided does not exist"))
    }
}
