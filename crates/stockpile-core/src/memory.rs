//! In-memory reference backend for testing.
//!
//! Thread-safe via `RwLock`. Not suitable for production: it exists so the
//! engines and every test in the workspace can run against real
//! [`RemoteStore`] semantics (ordered pagination, live subscription
//! delivery, atomic bounded commits with merge writes) without a network.
//!
//! The store keeps instrumentation counters (commits issued, largest batch
//! seen, queries served) so tests can assert on batching behavior.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::document::{Document, DocumentId, FieldValue, Fields};
use crate::error::{Error, Result};
use crate::paths::{CollectionPath, DocumentRef};
use crate::store::{DocumentEvent, DocumentWatch, RemoteStore, WriteOp, MAX_BATCH_OPS};

/// In-memory [`RemoteStore`] with live subscription delivery.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    commits: AtomicUsize,
    max_commit_ops: AtomicUsize,
    queries: AtomicUsize,
    subscribes: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    /// Full document path -> fields.
    documents: BTreeMap<String, Fields>,
    /// Full document path -> open subscription senders.
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<DocumentEvent>>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests: merge-writes one document into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying commit fails.
    pub async fn insert(&self, collection: &CollectionPath, doc: Document) -> Result<()> {
        let target = collection.doc(doc.id);
        self.commit(vec![WriteOp::SetMerge {
            target,
            fields: doc.fields,
        }])
        .await
    }

    /// Number of commits applied so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Largest operation count seen in a single commit.
    #[must_use]
    pub fn max_commit_ops(&self) -> usize {
        self.max_commit_ops.load(Ordering::SeqCst)
    }

    /// Number of page queries served so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `subscribe` calls accepted so far.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Total number of stored documents, across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.read_inner().documents.len()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Resolves `ServerTimestamp` sentinels against one commit-wide clock
    /// reading, then merges into the stored fields.
    fn merge_fields(stored: &mut Fields, incoming: Fields, now: chrono::DateTime<Utc>) {
        for (name, value) in incoming {
            let resolved = match value {
                FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
                other => other,
            };
            stored.insert(name, resolved);
        }
    }
}

/// Splits a stored path into (collection prefix, document id), returning
/// the id only for direct children of `collection`.
fn child_id<'a>(path: &'a str, collection: &CollectionPath) -> Option<&'a str> {
    let rest = path.strip_prefix(collection.as_str())?.strip_prefix('/')?;
    // Ids never contain '/', so anything deeper belongs to a subcollection.
    if rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>> {
        let inner = self.read_inner();
        Ok(inner.documents.get(&doc.path()).map(|fields| Document {
            id: doc.id().clone(),
            fields: fields.clone(),
        }))
    }

    async fn query_page(
        &self,
        collection: &CollectionPath,
        order_field: &str,
        after: Option<&Document>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let inner = self.read_inner();
        let mut matches: Vec<Document> = inner
            .documents
            .iter()
            .filter_map(|(path, fields)| {
                let id = child_id(path, collection)?;
                Some(Document {
                    id: DocumentId::new(id).ok()?,
                    fields: fields.clone(),
                })
            })
            .collect();
        drop(inner);

        matches.sort_by(|a, b| {
            a.order_key(order_field)
                .cmp(&b.order_key(order_field))
                .then_with(|| a.id.cmp(&b.id))
        });

        if let Some(cursor) = after {
            let cursor_key = (cursor.order_key(order_field), cursor.id.clone());
            matches.retain(|doc| (doc.order_key(order_field), doc.id.clone()) > cursor_key);
        }
        matches.truncate(limit);
        Ok(matches)
    }

    async fn subscribe(&self, doc: &DocumentRef) -> Result<DocumentWatch> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.write_inner();
        let initial = match inner.documents.get(&doc.path()) {
            Some(fields) => DocumentEvent::Snapshot {
                exists: true,
                fields: fields.clone(),
            },
            None => DocumentEvent::Snapshot {
                exists: false,
                fields: Fields::new(),
            },
        };
        // The receiver is brand new, so this send cannot fail.
        let _ = tx.send(initial);
        inner.watchers.entry(doc.path()).or_default().push(tx);
        Ok(DocumentWatch::new(rx))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        if ops.len() > MAX_BATCH_OPS {
            return Err(Error::InvalidInput(format!(
                "batch of {} operations exceeds the limit of {MAX_BATCH_OPS}",
                ops.len()
            )));
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        self.max_commit_ops.fetch_max(ops.len(), Ordering::SeqCst);

        let now = Utc::now();
        let mut touched: Vec<String> = Vec::new();
        let mut inner = self.write_inner();
        for op in ops {
            match op {
                WriteOp::Delete(target) => {
                    inner.documents.remove(&target.path());
                    touched.push(target.path());
                }
                WriteOp::SetMerge { target, fields } => {
                    let stored = inner.documents.entry(target.path()).or_default();
                    Self::merge_fields(stored, fields, now);
                    touched.push(target.path());
                }
            }
        }

        // Deliver one snapshot per touched document, pruning dead senders.
        for path in touched {
            let event = match inner.documents.get(&path) {
                Some(fields) => DocumentEvent::Snapshot {
                    exists: true,
                    fields: fields.clone(),
                },
                None => DocumentEvent::Snapshot {
                    exists: false,
                    fields: Fields::new(),
                },
            };
            let mut gone = false;
            if let Some(senders) = inner.watchers.get_mut(&path) {
                senders.retain(|tx| tx.send(event.clone()).is_ok());
                gone = senders.is_empty();
            }
            if gone {
                inner.watchers.remove(&path);
            }
        }
        Ok(())
    }
}
