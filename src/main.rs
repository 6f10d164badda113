use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod config;
mod error;
mod logging;
mod models;
mod services;

use services::deseasonalizer::Deseasonalizer;
use services::x13::X13Adjuster;

fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    let args = cli::CliArgs::parse();

    // Load configuration
    let config = config::Config::new(args.root)?;
    let adjuster = X13Adjuster::new(config.x13_path.clone());
    tracing::info!(
        "Deseasonalizing workbooks under {} with {}",
        config.root.display(),
        adjuster.binary().display()
    );

    let output_dir = config.output_dir.clone();
    let deseasonalizer = Deseasonalizer::new(config, adjuster);

    let written = deseasonalizer
        .run(&mut std::io::stdout().lock())
        .with_context(|| format!("Deseasonalization into {} failed", output_dir.display()))?;

    tracing::info!("Done: {} file(s) written", written.len());
    Ok(())
}
