use clap::{Args, Parser};
use config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod telemetry;

#[derive(Parser)]
enum CliCommand {
    /// Serve the /numbers endpoint
    NumbersRouter(CliArgs),
}

#[derive(Args)]
struct CliArgs {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(long)]
    config_file_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    match cli {
        CliCommand::NumbersRouter(args) => run_numbers_router(args.config_file_path.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn run_numbers_router(config_path: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry has to be initialized before the runtime starts
    let _sentry_guard = match telemetry::init_logging(config.common.logging.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = telemetry::init_metrics(metrics_config)
    {
        tracing::error!(error = %e, "Failed to set up metrics");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(numbers_router::run(config.numbers_router)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Numbers router stopped");
            ExitCode::FAILURE
        }
    }
}
