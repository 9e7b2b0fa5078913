//! Batched cascading deletion.
//!
//! [`CascadingDeleter`] walks a [`DeletionPlan`] and issues size-bounded
//! atomic delete batches. Correctness rests on three properties:
//!
//! - the batch cap sits strictly below the backend's hard per-batch limit,
//!   so a commit can never overflow;
//! - every step is idempotent (a missing root is success, deletes of
//!   missing documents succeed), so a partially completed deletion can be
//!   retried end to end without operator intervention;
//! - children drain before parents, so a retry re-enumerates an empty or
//!   shrinking collection rather than dangling references.
//!
//! There is no cancellation and no rollback: on the first commit failure
//! the call aborts and reports, already-committed batches stay deleted,
//! and the caller retries the whole call.
//!
//! Callers must not start two cascades against the same root concurrently;
//! the engine takes no lock.

use std::mem;

use tracing::Instrument;

use stockpile_core::{cascade_span, RemoteStore, WriteOp};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::plan::DeletionPlan;

/// Accumulates write operations and commits them in cap-bounded batches.
#[derive(Debug)]
pub struct BatchWriter<'a, S: RemoteStore> {
    store: &'a S,
    cap: usize,
    ops: Vec<WriteOp>,
    commits: usize,
}

impl<'a, S: RemoteStore> BatchWriter<'a, S> {
    /// Creates a writer committing at most `cap` operations per batch.
    #[must_use]
    pub fn new(store: &'a S, cap: usize) -> Self {
        Self {
            store,
            cap,
            ops: Vec::new(),
            commits: 0,
        }
    }

    /// Number of operations currently queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.ops.len()
    }

    /// Number of batches committed so far.
    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }

    /// Queues one operation, flushing first the moment the queue reaches
    /// the cap.
    ///
    /// # Errors
    ///
    /// Propagates a failed flush; queued-but-uncommitted operations are
    /// dropped (the caller aborts and retries the whole plan).
    pub async fn enqueue(&mut self, op: WriteOp) -> stockpile_core::Result<()> {
        self.ops.push(op);
        if self.ops.len() >= self.cap {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commits all queued operations, if any.
    ///
    /// # Errors
    ///
    /// Propagates the commit failure.
    pub async fn flush(&mut self) -> stockpile_core::Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let ops = mem::take(&mut self.ops);
        let count = ops.len();
        self.store.commit(ops).await?;
        self.commits += 1;
        tracing::debug!(operations = count, batch = self.commits, "delete batch committed");
        Ok(())
    }
}

/// Executes deletion plans in size-bounded batches.
#[derive(Debug)]
pub struct CascadingDeleter<'a, S: RemoteStore> {
    store: &'a S,
    batch_cap: usize,
}

impl<'a, S: RemoteStore> CascadingDeleter<'a, S> {
    /// Creates a deleter with the configured batch cap.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration fails
    /// validation.
    pub fn new(store: &'a S, config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            batch_cap: config.batch_cap,
        })
    }

    /// Deletes the plan's root and its entire dependent graph.
    ///
    /// An already-absent root is success: the cascade is idempotent and a
    /// second call observes nothing left to delete.
    ///
    /// # Errors
    ///
    /// Propagates the first fetch or commit failure. Completed batches
    /// stay deleted; retrying the whole call is always safe.
    pub async fn delete_cascade(&self, plan: &DeletionPlan) -> Result<()> {
        let span = cascade_span(&plan.root().path());
        async {
            let Some(root) = self.store.get(plan.root()).await? else {
                tracing::debug!("root already absent, nothing to delete");
                return Ok(());
            };

            let mut writer = BatchWriter::new(self.store, self.batch_cap);
            for step in plan.steps() {
                // Page size matches the batch cap: one page never queues
                // more than one batch worth of primary deletes.
                let mut fetcher = PageFetcher::new(
                    step.collection().clone(),
                    step.order_field(),
                    self.batch_cap,
                );
                loop {
                    let page = fetcher.fetch_next(self.store).await?;
                    if page.is_empty() {
                        break;
                    }
                    for doc in page {
                        if let Some(effect) = step.side_effect() {
                            for target in effect(&doc) {
                                writer.enqueue(WriteOp::Delete(target)).await?;
                            }
                        }
                        writer
                            .enqueue(WriteOp::Delete(step.collection().doc(doc.id)))
                            .await?;
                    }
                }
            }

            for effect in plan.root_side_effects() {
                for target in effect(&root) {
                    writer.enqueue(WriteOp::Delete(target)).await?;
                }
            }
            writer.enqueue(WriteOp::Delete(plan.root().clone())).await?;
            writer.flush().await?;

            tracing::info!(commits = writer.commits(), "cascade delete complete");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::document::fields;
    use stockpile_core::{Document, DocumentId, FieldValue, InventoryPaths, MemoryStore};

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn batch_writer_flushes_at_cap() {
        let store = MemoryStore::new();
        let items = InventoryPaths::user_items(&id("u1"));
        let mut writer = BatchWriter::new(&store, 3);

        for n in 0..7 {
            writer
                .enqueue(WriteOp::Delete(items.doc(id(&format!("d{n}")))))
                .await
                .unwrap();
        }
        assert_eq!(writer.commits(), 2);
        assert_eq!(writer.queued(), 1);

        writer.flush().await.unwrap();
        assert_eq!(writer.commits(), 3);
        assert_eq!(writer.queued(), 0);
        // Flushing an empty queue issues no commit.
        writer.flush().await.unwrap();
        assert_eq!(writer.commits(), 3);
        assert_eq!(store.max_commit_ops(), 3);
    }

    #[tokio::test]
    async fn deleting_absent_root_is_success_without_commits() {
        let store = MemoryStore::new();
        let deleter = CascadingDeleter::new(&store, &SyncConfig::default()).unwrap();
        let plan = crate::plan::group_deletion_plan(&id("ghost"));

        deleter.delete_cascade(&plan).await.unwrap();
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn side_effect_deletes_ride_along() {
        let store = MemoryStore::new();
        let group = id("g1");
        store
            .insert(
                &InventoryPaths::groups(),
                Document::new(group.clone())
                    .with_field(fields::OWNER_ID, FieldValue::Str("u1".into())),
            )
            .await
            .unwrap();
        store
            .insert(
                &InventoryPaths::group_members(&group),
                Document::new(id("u2"))
                    .with_field(fields::DISPLAY_NAME, FieldValue::Str("Sam".into())),
            )
            .await
            .unwrap();
        // Reverse-index records for owner and member.
        store
            .insert(
                &InventoryPaths::memberships(&id("u1")),
                Document::new(group.clone()),
            )
            .await
            .unwrap();
        store
            .insert(
                &InventoryPaths::memberships(&id("u2")),
                Document::new(group.clone()),
            )
            .await
            .unwrap();

        let deleter = CascadingDeleter::new(&store, &SyncConfig::default()).unwrap();
        deleter
            .delete_cascade(&crate::plan::group_deletion_plan(&group))
            .await
            .unwrap();

        assert_eq!(store.document_count(), 0);
    }
}
