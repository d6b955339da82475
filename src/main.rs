//! scholar-sync - scheduled citation stats updater
//!
//! One invocation performs one update run: fetch the configured author
//! profile's stats, then write or preserve the JSON snapshot. Exit code is
//! zero for a fresh write and for a soft success (no new data, prior
//! snapshot retained); nonzero only when no data could be obtained and no
//! prior snapshot exists.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use scholar_sync::config::Config;
use scholar_sync::orchestrator::Orchestrator;
use scholar_sync::sources;
use scholar_sync::store::{self, Outcome};

#[derive(Parser)]
#[command(
    name = "scholar-sync",
    version,
    about = "Update the scholar-stats.json snapshot for one author profile"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Author profile identifier (overrides config)
    #[arg(long)]
    author_id: Option<String>,

    /// Snapshot output path (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting scholar-sync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration: {}", e))?;
    if let Some(author_id) = cli.author_id {
        config.author_id = author_id;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }

    info!(
        author_id = %config.author_id,
        output = %config.output_path.display(),
        "fetching scholar statistics"
    );

    let sources = sources::eligible_sources(&config);
    if sources.is_empty() {
        warn!("no fetch sources are available; relying on the existing snapshot");
    }

    let orchestrator = Orchestrator::new(&config, sources);
    let fetched = orchestrator.run(&config.author_id).await;

    match store::persist(&config.output_path, fetched) {
        Ok(Outcome::Written(record)) => {
            info!(
                citations = record.citations,
                publications = record.publications,
                h_index = record.h_index,
                i10_index = record.i10_index,
                last_updated = %record.last_updated,
                "scholar stats updated"
            );
            Ok(())
        }
        Ok(Outcome::KeptExisting(previous)) => {
            info!(
                last_updated = %previous.last_updated,
                "no new stats this run; existing snapshot retained"
            );
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "update run failed");
            Err(err.into())
        }
    }
}
