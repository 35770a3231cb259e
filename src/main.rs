use std::panic;
use std::process::ExitCode;

use clap::Parser;
use pdp_bench::{Cli, load_config, logging::setup_tracing, run_benchmark};
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = setup_tracing(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    panic::set_hook(Box::new(|panic_info| {
        error!(?panic_info, "FATAL: Panic occurred");
    }));

    info!(
        path = %config.output.path,
        index = %config.run.index,
        reuse = config.run.reuse,
        iterations = config.run.iterations,
        runs = config.run.runs,
        "pdp-bench starting up"
    );

    match run_benchmark(&config) {
        Ok(run) => {
            info!(
                run_id = %run.run_id(),
                configurations = run.identifiers().len(),
                "Benchmark complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                configuration = e.configuration().unwrap_or("-"),
                phase = e.phase(),
                error = %e,
                "FATAL: Benchmark aborted"
            );
            ExitCode::FAILURE
        }
    }
}
