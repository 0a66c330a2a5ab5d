//! High-level pipeline: scan → build units → (request → parse → sync) per unit.
//!
//! This module drives one documentation run over a source tree:
//!   - Scans the configured root for source files ([`crate::scan`])
//!   - Groups them into analysis units ([`crate::units`])
//!   - For each unit, in order: asks the model for an artifact, parses it, and
//!     upserts it into the document store ([`crate::sync`])
//!   - Sleeps for the configured cooldown between units
//!
//! # Error Handling
//! Scan and unit-building failures abort the run in every mode. After that the
//! policy depends on the mode: per-file runs log each failed unit, record it in
//! the report and carry on; a feature run has a single unit, so its failure is
//! returned as the run's error.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SynchroniseReport`], [`UnitReport`], [`PipelineError`].

use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

use crate::artifact::{self, ArtifactParseError};
use crate::config::SynchroniseConfig;
use crate::contract::{DocumentStore, Generator};
use crate::render::DiagramRenderer;
use crate::request::{DocumentationRequester, UpstreamError};
use crate::scan::{self, ScanError};
use crate::sync::{SyncEngine, SyncError, SyncOutcome};
use crate::units::{self, AnalysisUnit, EmptyUnitError, UnitMode};

/// Any failure the pipeline can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    EmptyUnit(#[from] EmptyUnitError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    ArtifactParse(#[from] ArtifactParseError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitResult {
    Created {
        record_id: String,
    },
    Updated {
        record_id: String,
        removed_blocks: usize,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit_key: String,
    pub result: UnitResult,
}

/// What a run did, unit by unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchroniseReport {
    pub units: Vec<UnitReport>,
    /// Relative names of files left out by the unit builder.
    pub skipped_files: Vec<String>,
}

impl SynchroniseReport {
    pub fn created(&self) -> usize {
        self.count(|r| matches!(r, UnitResult::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|r| matches!(r, UnitResult::Updated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, UnitResult::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&UnitResult) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.result)).count()
    }
}

impl From<SyncOutcome> for UnitResult {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Created { record_id } => UnitResult::Created { record_id },
            SyncOutcome::Updated {
                record_id,
                removed_blocks,
            } => UnitResult::Updated {
                record_id,
                removed_blocks,
            },
        }
    }
}

async fn process_unit<G, S>(
    unit: &AnalysisUnit,
    mode: &UnitMode,
    requester: &DocumentationRequester<'_, G>,
    engine: &SyncEngine<'_, S>,
) -> Result<SyncOutcome, PipelineError>
where
    G: Generator,
    S: DocumentStore,
{
    let raw = requester.request(unit, mode).await?;
    let artifact = artifact::parse(&raw, mode).map_err(|e| {
        error!(
            unit_key = %unit.unit_key,
            reason = %e.reason,
            raw_payload = %e.raw_payload,
            "Model response could not be parsed"
        );
        e
    })?;
    info!(unit_key = %unit.unit_key, title = %artifact.title(), "Parsed documentation artifact");
    let outcome = engine.sync(&artifact, &unit.source_label()).await?;
    Ok(outcome)
}

/// Run the whole pipeline for `config` against the given services.
pub async fn synchronise<G, S>(
    config: &SynchroniseConfig,
    generator: &G,
    store: &S,
) -> Result<SynchroniseReport, PipelineError>
where
    G: Generator,
    S: DocumentStore,
{
    info!(root = %config.root.display(), mode = ?config.mode, "[SYNC] Starting documentation run");

    let files = scan::scan(&config.root, &config.extensions)?;
    let built = units::build_units(files, &config.mode, &config.limits)?;

    let mut report = SynchroniseReport {
        units: Vec::with_capacity(built.units.len()),
        skipped_files: built
            .skipped
            .iter()
            .map(|s| s.relative_name.clone())
            .collect(),
    };

    let requester = DocumentationRequester::new(generator, config.request.clone());
    let engine = SyncEngine::new(store, DiagramRenderer::new(config.diagram_base_url.clone()));
    let total = built.units.len();

    for (index, unit) in built.units.iter().enumerate() {
        let span = info_span!("unit", unit_key = %unit.unit_key, index, total);
        let result = process_unit(unit, &config.mode, &requester, &engine)
            .instrument(span)
            .await;

        match (result, &config.mode) {
            (Ok(outcome), _) => {
                info!(unit_key = %unit.unit_key, ?outcome, "[SYNC] Unit synchronised");
                report.units.push(UnitReport {
                    unit_key: unit.unit_key.clone(),
                    result: outcome.into(),
                });
            }
            (Err(e), UnitMode::PerFile) => {
                error!(unit_key = %unit.unit_key, error = %e, "[SYNC][ERROR] Unit failed; continuing");
                report.units.push(UnitReport {
                    unit_key: unit.unit_key.clone(),
                    result: UnitResult::Failed {
                        error: e.to_string(),
                    },
                });
            }
            (Err(e), UnitMode::Feature { .. }) => {
                error!(unit_key = %unit.unit_key, error = %e, "[SYNC][ERROR] Feature unit failed; aborting run");
                return Err(e);
            }
        }

        if index + 1 < total && !config.cooldown.is_zero() {
            info!(cooldown_ms = config.cooldown.as_millis() as u64, "[SYNC] Cooling down before next unit");
            tokio::time::sleep(config.cooldown).await;
        }
    }

    info!(
        created = report.created(),
        updated = report.updated(),
        failed = report.failed(),
        skipped_files = report.skipped_files.len(),
        "[SYNC] Documentation run finished"
    );
    Ok(report)
}
