use std::env;
use std::process::ExitCode;

use listbench::Error;
use listbench::bench::{self, BenchConfigBuilder, BenchReport, USAGE};
use log::{LevelFilter, error, info};

fn main() -> ExitCode {
    if let Err(err) = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("failed to initialize logging: {err}");
    }

    let config = match BenchConfigBuilder::from_args(env::args().skip(1))
        .and_then(|builder| builder.with_env(|key| env::var(key).ok()))
        .and_then(BenchConfigBuilder::build)
    {
        Ok(config) => config,
        Err(err @ Error::Usage(_)) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    // Thread lines are logged as each thread finishes; this only closes a run.
    let log_run = |report: &BenchReport| {
        info!("[{}] run finished, converged: {}", report.discipline, report.converged());
    };
    let reports = match bench::run_each(&config, log_run) {
        Ok(reports) => reports,
        Err(err) => {
            error!("benchmark failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    if reports.iter().all(|report| report.converged()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
