//! The per-document subscription registry.
//!
//! The registry is the single owner of all live subscription handles for
//! one session. Other components never touch handles directly; they open
//! and close subscriptions exclusively through the registry, which keeps
//! the "at most one subscription per document id" invariant in one place.
//!
//! Each open subscription runs a forwarder task that funnels backend
//! events into the session's single event channel, tagged with the session
//! epoch. Closing aborts the forwarder; the session discards any event
//! carrying a stale epoch, so nothing is applied after teardown.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stockpile_core::{DocumentEvent, DocumentId, DocumentRef, RemoteStore, Result};

/// One event as delivered to the session's merge loop.
#[derive(Debug)]
pub struct SubscriptionMessage {
    /// The session epoch at which the subscription was opened.
    pub epoch: u64,
    /// The document the event concerns.
    pub id: DocumentId,
    /// The event itself.
    pub event: DocumentEvent,
}

struct SubscriptionHandle {
    forwarder: JoinHandle<()>,
}

/// Owns the set of live per-document subscriptions for one session.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: HashMap<DocumentId, SubscriptionHandle>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a subscription is open for the given id.
    #[must_use]
    pub fn is_open(&self, id: &DocumentId) -> bool {
        self.subscriptions.contains_key(id)
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if no subscriptions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Opens a subscription for the given document.
    ///
    /// Idempotent: if a subscription for that id is already open, this is a
    /// no-op and no second subscription is created.
    ///
    /// # Errors
    ///
    /// Propagates the store's subscribe failure; the registry is unchanged
    /// in that case.
    pub async fn open<S: RemoteStore>(
        &mut self,
        store: &S,
        doc: &DocumentRef,
        epoch: u64,
        events: &mpsc::UnboundedSender<SubscriptionMessage>,
    ) -> Result<()> {
        if self.subscriptions.contains_key(doc.id()) {
            return Ok(());
        }

        let mut watch = store.subscribe(doc).await?;
        let id = doc.id().clone();
        let tx = events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = watch.recv().await {
                let message = SubscriptionMessage {
                    epoch,
                    id: id.clone(),
                    event,
                };
                if tx.send(message).is_err() {
                    break;
                }
            }
        });

        self.subscriptions
            .insert(doc.id().clone(), SubscriptionHandle { forwarder });
        Ok(())
    }

    /// Closes the subscription for one id, if open.
    pub fn close(&mut self, id: &DocumentId) {
        if let Some(handle) = self.subscriptions.remove(id) {
            handle.forwarder.abort();
        }
    }

    /// Closes every open subscription.
    ///
    /// After this returns no forwarder task is running; combined with the
    /// caller bumping its epoch, no further event reaches the view.
    pub fn close_all(&mut self) {
        for (_, handle) in self.subscriptions.drain() {
            handle.forwarder.abort();
        }
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("open", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::document::fields;
    use stockpile_core::{Document, FieldValue, InventoryPaths, MemoryStore};

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn open_is_idempotent_per_id() {
        let store = MemoryStore::new();
        let items = InventoryPaths::user_items(&id("u1"));
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut registry = SubscriptionRegistry::new();
        registry.open(&store, &items.doc(id("a")), 0, &tx).await.unwrap();
        registry.open(&store, &items.doc(id("a")), 0, &tx).await.unwrap();
        registry.open(&store, &items.doc(id("a")), 0, &tx).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(store.subscribe_count(), 1);
    }

    #[tokio::test]
    async fn events_are_forwarded_with_epoch() {
        let store = MemoryStore::new();
        let items = InventoryPaths::user_items(&id("u1"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut registry = SubscriptionRegistry::new();
        registry.open(&store, &items.doc(id("a")), 7, &tx).await.unwrap();

        // Initial snapshot (document absent).
        let message = rx.recv().await.unwrap();
        assert_eq!(message.epoch, 7);
        assert_eq!(message.id, id("a"));
        assert!(matches!(
            message.event,
            DocumentEvent::Snapshot { exists: false, .. }
        ));

        store
            .insert(
                &items,
                Document::new(id("a")).with_field(fields::QUANTITY, FieldValue::Int(3)),
            )
            .await
            .unwrap();
        let message = rx.recv().await.unwrap();
        assert!(matches!(
            message.event,
            DocumentEvent::Snapshot { exists: true, .. }
        ));
    }

    #[tokio::test]
    async fn close_all_stops_forwarding() {
        let store = MemoryStore::new();
        let items = InventoryPaths::user_items(&id("u1"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut registry = SubscriptionRegistry::new();
        registry.open(&store, &items.doc(id("a")), 0, &tx).await.unwrap();
        registry.open(&store, &items.doc(id("b")), 0, &tx).await.unwrap();
        assert_eq!(registry.len(), 2);

        registry.close_all();
        assert!(registry.is_empty());
        assert!(!registry.is_open(&id("a")));

        // Drain whatever was in flight before the close, then drop our
        // sender: recv returning None proves no forwarder is left.
        drop(tx);
        while rx.recv().await.is_some() {}
    }
}
