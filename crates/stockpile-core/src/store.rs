//! The abstract remote document store contract.
//!
//! All backends implement [`RemoteStore`]. The contract mirrors what the
//! hosted document databases this engine targets actually offer:
//!
//! - ordered, cursor-paginated collection queries
//! - single-document reads
//! - per-document live subscriptions (initial snapshot, then one event per
//!   change)
//! - atomic write batches with a hard per-batch operation limit and
//!   merge-semantics set writes
//!
//! No multi-document transactions over unbounded data exist; the engines
//! compensate with idempotent, order-independent writes.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::document::{Document, Fields};
use crate::error::Result;
use crate::paths::{CollectionPath, DocumentRef};

/// Hard backend limit on operations per atomic batch.
///
/// Engines must queue strictly fewer operations per commit; see the batch
/// cap in the sync crate's config.
pub const MAX_BATCH_OPS: usize = 500;

/// A single operation inside an atomic write batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Deletes a document. Succeeds even if the document does not exist.
    Delete(DocumentRef),
    /// Writes fields into a document with merge semantics, creating it if
    /// absent. `ServerTimestamp` sentinels resolve at commit time.
    SetMerge {
        /// The document to write.
        target: DocumentRef,
        /// The fields to merge in.
        fields: Fields,
    },
}

/// One event delivered on a per-document subscription.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// The document's current state: whether it exists, and its fields.
    Snapshot {
        /// False when the document has been deleted.
        exists: bool,
        /// The document's fields (empty when `exists` is false).
        fields: Fields,
    },
    /// A transient stream error. The subscription remains open; the backend
    /// is expected to re-deliver on recovery.
    StreamError {
        /// Description of the stream failure.
        message: String,
    },
}

/// The receiving end of one live per-document subscription.
///
/// The first event is always a snapshot of the document's current state;
/// every subsequent change produces another event. Dropping the watch ends
/// delivery.
#[derive(Debug)]
pub struct DocumentWatch {
    events: mpsc::UnboundedReceiver<DocumentEvent>,
}

impl DocumentWatch {
    /// Creates a watch from its event channel (backend side).
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<DocumentEvent>) -> Self {
        Self { events }
    }

    /// Waits for the next event. Returns `None` once the backend side is
    /// gone.
    pub async fn recv(&mut self) -> Option<DocumentEvent> {
        self.events.recv().await
    }
}

/// The abstract remote document store.
///
/// Implementations must be safe to share across tasks; every method may be
/// pending concurrently with others.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Reads a single document. Returns `Ok(None)` if it does not exist.
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>>;

    /// Returns up to `limit` documents of `collection`, ordered ascending by
    /// `order_field` with the document id as tiebreaker, strictly after the
    /// `after` cursor (the last document of the previous page).
    ///
    /// An empty result means the collection is exhausted past the cursor.
    /// On failure no cursor state exists to corrupt; callers retry freely.
    async fn query_page(
        &self,
        collection: &CollectionPath,
        order_field: &str,
        after: Option<&Document>,
        limit: usize,
    ) -> Result<Vec<Document>>;

    /// Opens a live subscription on one document.
    async fn subscribe(&self, doc: &DocumentRef) -> Result<DocumentWatch>;

    /// Commits a batch of writes atomically.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the batch exceeds [`MAX_BATCH_OPS`],
    /// or a transport/permission error if the commit fails; in that case
    /// none of the batch's operations were applied.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()>;
}
