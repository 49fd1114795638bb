use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use coda_cli::commands::{
    check_rel, columns, import_legacy, kappa, make_rel, merge, nest, resample, validate,
};
use coda_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(project) = cli.project {
        config.project_path = Some(project);
    }
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Columns(args)) => columns::run(&mut stdout, args, &config)?,
        Some(Commands::Merge(args)) => merge::run(&mut stdout, args, &config)?,
        Some(Commands::Resample(args)) => resample::run(&mut stdout, args, &config)?,
        Some(Commands::Kappa(args)) => kappa::run(&mut stdout, args, &config)?,
        Some(Commands::CheckRel(args)) => check_rel::run(&mut stdout, args, &config)?,
        Some(Commands::MakeRel(args)) => make_rel::run(&mut stdout, args, &config)?,
        Some(Commands::Nest(args)) => nest::run(&mut stdout, args, &config)?,
        Some(Commands::Validate(args)) => validate::run(&mut stdout, args, &config)?,
        Some(Commands::ImportLegacy(args)) => import_legacy::run(&mut stdout, args, &config)?,
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
