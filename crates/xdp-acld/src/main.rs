//! xdp-acld entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use xdp_acld::app::{self, StoreSource};
use xdp_acld::cli::{Cli, Command};
use xdp_acld::config::DaemonConfig;
use xdp_acld::logging::init_logging;

async fn run(cli: Cli, config: DaemonConfig) -> Result<ExitCode> {
    match cli.command {
        Command::Check { rules } => {
            let path = app::rules_path(&config, rules);
            let report = app::check(&config, &path)?;
            print!("{}", report);
            if !report.issues.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Classify {
            rules,
            dump,
            frames,
            workers,
        } => {
            let source = StoreSource::resolve(&config, rules, dump);
            let (verdicts, stats) = app::classify(&config, &source, &frames, workers).await?;
            for verdict in &verdicts {
                println!("{}", verdict);
            }
            println!(
                "frames={} matched={} no-match={} skipped={}",
                stats.frames, stats.matched, stats.exhausted, stats.skipped
            );
        }
        Command::Dump { rules, out } => {
            let path = app::rules_path(&config, rules);
            let written = app::dump(&config, &path, &out)?;
            println!("wrote {} bytes to {}", written, out.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DaemonConfig::load_or_default(&cli.config)
        .and_then(|config| config.validate().map(|_| config))
        .with_context(|| format!("Invalid config {}", cli.config.display()))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("xdp-acld: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level);
    info!(config = %cli.config.display(), "Starting xdp-acld");

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
