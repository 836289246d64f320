// ABOUTME: Entry point for the layerboot CLI application.
// ABOUTME: Parses arguments, installs redacted logging, and maps the run outcome to an exit code.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use commands::Invocation;
use layerboot::config::Config;
use layerboot::engine::WalkOptions;
use layerboot::error::{Error, Result};
use layerboot::journal::{OverallOutcome, RunMode};
use layerboot::layers::Registry;
use layerboot::output::{Output, OutputMode};
use layerboot::profile::CustomerProfile;
use layerboot::secrets::{RedactingMakeWriter, Redactor};
use layerboot::types::LayerSelector;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let redactor = Redactor::new();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(RedactingMakeWriter::stderr(redactor.clone()))
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode, redactor.clone());

    match run(cli, &output, redactor).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            output.error(&format!("{}: {e}", e.kind()));
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, output: &Output, redactor: Redactor) -> Result<OverallOutcome> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };

    let registry = Registry::standard()?;
    config.validate(&registry.names())?;

    if let LayerSelector::Only(name) = &cli.layer
        && !registry.contains(name.as_str())
    {
        return Err(Error::UnknownLayer {
            name: name.to_string(),
            expected: registry.names().join(", "),
        });
    }

    let profile = CustomerProfile::discover(&config.profiles_dir, &cli.customer)?;
    let invocation = Invocation {
        config,
        registry,
        profile,
        options: WalkOptions {
            force: cli.force,
            selector: cli.layer,
        },
        break_lock: cli.break_lock,
    };

    if cli.plan {
        return commands::plan(&invocation, output, redactor).await;
    }

    let mode = if cli.destroy {
        RunMode::Teardown
    } else {
        RunMode::Bootstrap
    };
    commands::execute(&invocation, mode, output, redactor).await
}
