///
/// This module implements the CLI surface for docsync: argument parsing and the
/// async `run` entrypoint that wires settings, service clients and the core pipeline.
///
/// All pipeline logic (scanning, prompting, parsing, syncing) lives in the
/// [`docsync-core`] crate. This module is CLI glue only.
///
/// ## How To Use
/// - For command-line users: `docsync [ROOT]` (defaults to `./src`).
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`docsync-core`]: ../../docsync-core/
use crate::generate::ModelClient;
use crate::load_config::resolve_settings;
use crate::store::NotionStore;
use anyhow::Result;
use clap::Parser;
use docsync_core::synchronise::{synchronise, UnitResult};
use std::path::PathBuf;

/// Root scanned when no argument is given.
pub const DEFAULT_ROOT: &str = "./src";

/// CLI for docsync: document a source tree into a Notion database.
#[derive(Debug, Parser)]
#[clap(
    name = "docsync",
    version,
    about = "Generate structured documentation for a source tree and sync it into a Notion database"
)]
pub struct Cli {
    /// Directory to scan (the feature's directory in feature mode)
    #[clap(default_value = DEFAULT_ROOT)]
    pub root: PathBuf,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let settings = resolve_settings()?;
    let config = settings.into_config(cli.root)?;

    let generator = ModelClient::new_from_env()
        .map_err(|e| anyhow::anyhow!("Failed to construct model client: {e}"))?;
    let store = NotionStore::new_from_env()
        .map_err(|e| anyhow::anyhow!("Failed to construct Notion client: {e}"))?;

    tracing::info!(command = "sync", root = %config.root.display(), "Starting documentation run");
    match synchronise(&config, &generator, &store).await {
        Ok(report) => {
            for unit in &report.units {
                match &unit.result {
                    UnitResult::Created { record_id } => {
                        tracing::info!(unit_key = %unit.unit_key, record_id = %record_id, "created")
                    }
                    UnitResult::Updated {
                        record_id,
                        removed_blocks,
                    } => tracing::info!(
                        unit_key = %unit.unit_key,
                        record_id = %record_id,
                        removed_blocks,
                        "updated"
                    ),
                    UnitResult::Failed { error } => {
                        tracing::warn!(unit_key = %unit.unit_key, error = %error, "failed")
                    }
                }
            }
            tracing::info!(
                command = "sync",
                created = report.created(),
                updated = report.updated(),
                failed = report.failed(),
                skipped_files = report.skipped_files.len(),
                "Documentation run complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Documentation run failed");
            Err(anyhow::Error::new(e))
        }
    }
}
