// Transit query engine
// Main entry point for the transit binary

use clap::Parser;
use std::process::ExitCode;
use transit_engine::cli::{Cli, Command};
use transit_engine::config::Config;
use transit_engine::handlers::{
    error_report, handle_ask, handle_corpus, handle_doctor, handle_plan, OutputFormat,
};
use transit_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::debug!(
        "Transit v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Ask { query } => handle_ask(query, &config, format).await,
        Command::Plan { query } => handle_plan(query, &config, format).await,
        Command::Corpus => handle_corpus(&config, format).await,
        Command::Doctor => handle_doctor(&config, format).await,
    }
}
