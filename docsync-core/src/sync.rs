//! Idempotent upsert of one artifact into the document store.
//!
//! The record is found by title. A missing record is created; an existing one has
//! its properties overwritten and every child block deleted. In both cases the
//! rendered body is then appended in one call. Content is never merged.
//!
//! There is no rollback: if a deletion or the final append fails, the record is
//! left with fresh properties and a partially cleared body. The error says how
//! far the clear got. Re-running the unit repairs it.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::artifact::DocumentationArtifact;
use crate::contract::{BoxError, DocumentStore, RecordProperties};
use crate::render::{render_blocks, DiagramRenderer};

/// What `sync` did to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created { record_id: String },
    Updated {
        record_id: String,
        removed_blocks: usize,
    },
}

impl SyncOutcome {
    pub fn record_id(&self) -> &str {
        match self {
            SyncOutcome::Created { record_id } | SyncOutcome::Updated { record_id, .. } => {
                record_id
            }
        }
    }
}

/// The store operation that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    Lookup,
    Create,
    UpdateProperties,
    ListBlocks,
    /// A deletion failed after `deleted` blocks were already removed.
    DeleteBlock { deleted: usize, remaining: usize },
    Append,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Lookup => write!(f, "lookup by title"),
            SyncStage::Create => write!(f, "create record"),
            SyncStage::UpdateProperties => write!(f, "update properties"),
            SyncStage::ListBlocks => write!(f, "list child blocks"),
            SyncStage::DeleteBlock { deleted, remaining } => write!(
                f,
                "delete block ({deleted} deleted, {remaining} remaining; record partially cleared)"
            ),
            SyncStage::Append => write!(f, "append blocks"),
        }
    }
}

#[derive(Debug, Error)]
#[error("sync of `{title}` failed at {stage}: {source}")]
pub struct SyncError {
    pub title: String,
    pub stage: SyncStage,
    #[source]
    pub source: BoxError,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Writes artifacts into a [`DocumentStore`].
pub struct SyncEngine<'s, S: DocumentStore> {
    store: &'s S,
    diagrams: DiagramRenderer,
    clock: Clock,
}

impl<'s, S: DocumentStore> SyncEngine<'s, S> {
    pub fn new(store: &'s S, diagrams: DiagramRenderer) -> Self {
        Self {
            store,
            diagrams,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the timestamp source, e.g. to pin `last_updated` in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn sync(
        &self,
        artifact: &DocumentationArtifact,
        source_label: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let title = artifact.title();
        let fail = |stage: SyncStage, source: BoxError| {
            error!(%title, %stage, error = ?source, "Sync failed");
            SyncError {
                title: title.to_string(),
                stage,
                source,
            }
        };

        let props = RecordProperties {
            title: title.to_string(),
            last_updated: (self.clock)(),
            source_label: source_label.to_string(),
        };

        let existing = self
            .store
            .find_by_title(title)
            .await
            .map_err(|e| fail(SyncStage::Lookup, e))?;
        if existing.len() > 1 {
            warn!(%title, matches = existing.len(), "Several records share this title; updating the first");
        }

        let outcome = match existing.into_iter().next() {
            None => {
                let record = self
                    .store
                    .create_record(&props)
                    .await
                    .map_err(|e| fail(SyncStage::Create, e))?;
                info!(%title, record_id = %record.id, "Created record");
                SyncOutcome::Created {
                    record_id: record.id,
                }
            }
            Some(record) => {
                self.store
                    .update_properties(&record.id, &props)
                    .await
                    .map_err(|e| fail(SyncStage::UpdateProperties, e))?;
                let children = self
                    .store
                    .list_child_blocks(&record.id)
                    .await
                    .map_err(|e| fail(SyncStage::ListBlocks, e))?;
                let total = children.len();
                for (deleted, block) in children.iter().enumerate() {
                    self.store.delete_block(&block.id).await.map_err(|e| {
                        fail(
                            SyncStage::DeleteBlock {
                                deleted,
                                remaining: total - deleted,
                            },
                            e,
                        )
                    })?;
                }
                info!(%title, record_id = %record.id, removed = total, "Cleared existing record");
                SyncOutcome::Updated {
                    record_id: record.id,
                    removed_blocks: total,
                }
            }
        };

        let blocks = render_blocks(artifact, &self.diagrams);
        debug!(%title, blocks = blocks.len(), "Appending rendered blocks");
        self.store
            .append_child_blocks(outcome.record_id(), blocks)
            .await
            .map_err(|e| fail(SyncStage::Append, e))?;

        Ok(outcome)
    }
}
