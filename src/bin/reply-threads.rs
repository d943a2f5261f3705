use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reply_threads::{run_export, select_seeds, ExportConfig};

#[derive(Parser)]
#[command(
    name = "reply-threads",
    version,
    about = "Export reply threads in nested reading order"
)]
struct Cli {
    /// Path to the export config TOML file
    config: PathBuf,

    /// Validate the config and count seeds without exporting
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reply_threads=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ExportConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    if cli.dry_run {
        let seeds = select_seeds(&config).context("Failed to select seeds")?;
        println!("Config OK, {} seeds selected", seeds.len());
        return Ok(());
    }

    let summary = run_export(&config).context("Export failed")?;
    println!(
        "Processed {} seeds: {} threads written ({} records), {} skipped",
        summary.seeds, summary.threads_written, summary.records_written, summary.threads_skipped
    );
    Ok(())
}
