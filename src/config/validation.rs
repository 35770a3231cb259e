use std::path::{Path, PathBuf};

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;

use super::BenchConfig;
use crate::error::BenchError;

pub const ENV_PREFIX: &str = "PDP_BENCH_";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pdp-bench", version, about = "Benchmark a policy decision engine")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "PDP_BENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path for output files
    #[arg(long)]
    pub path: Option<String>,

    /// Reuse existing policies (true, false)
    #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
    pub reuse: Option<bool>,

    /// Index type used (SIMPLE, FAST, IMPROVED)
    #[arg(long)]
    pub index: Option<String>,

    /// JSON file containing test definition
    #[arg(long)]
    pub test: Option<String>,

    /// Engine constructions per test case
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Requests per engine instance
    #[arg(long)]
    pub runs: Option<usize>,

    /// Seed of the generated test suite
    #[arg(long)]
    pub seed: Option<u64>,

    /// Decision engine (embedded, stub)
    #[arg(long)]
    pub engine: Option<String>,

    /// Log filter directive
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Cli {
    /// Provider holding only the options given on the command line.
    fn overrides(&self) -> Figment {
        fn set<T: serde::Serialize>(figment: Figment, key: &str, value: &Option<T>) -> Figment {
            match value {
                Some(v) => figment.merge(Serialized::default(key, v)),
                None => figment,
            }
        }

        let mut figment = Figment::new();
        figment = set(figment, "output.path", &self.path);
        figment = set(figment, "run.reuse", &self.reuse);
        figment = set(figment, "run.index", &self.index);
        figment = set(figment, "run.suite", &self.test);
        figment = set(figment, "run.iterations", &self.iterations);
        figment = set(figment, "run.runs", &self.runs);
        figment = set(figment, "run.seed", &self.seed);
        figment = set(figment, "engine.kind", &self.engine);
        figment = set(figment, "logging.level", &self.log_level);
        figment = set(figment, "logging.format", &self.log_format);
        figment
    }
}

/// Layered configuration: defaults, optional TOML file, `PDP_BENCH_`
/// environment variables, then command-line options.
pub fn layered_figment(cli: &Cli) -> Result<Figment, BenchError> {
    let mut figment = Figment::new().merge(Serialized::defaults(BenchConfig::default()));

    if let Some(file) = &cli.config {
        if !file.is_file() {
            return Err(BenchError::Config(format!(
                "configuration file {} does not exist",
                file.display()
            )));
        }
        figment = figment.merge(Toml::file(file));
    }

    Ok(figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(cli.overrides()))
}

/// Extract and validate the run configuration.
pub fn load_config(cli: &Cli) -> Result<BenchConfig, BenchError> {
    extract(layered_figment(cli)?)
}

pub fn extract(figment: Figment) -> Result<BenchConfig, BenchError> {
    let config: BenchConfig = figment.extract()?;
    config.validate()?;

    if let Some(suite) = &config.run.suite {
        if !Path::new(suite).is_file() {
            return Err(BenchError::Config(format!(
                "test file provided does not exist: {suite}"
            )));
        }
    }
    Ok(config)
}
