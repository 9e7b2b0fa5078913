//! The caller-facing collection session.
//!
//! A [`CollectionSession`] owns everything one screen needs to mirror a
//! remote collection: the page fetcher, the materialized view, the
//! subscription registry, and the single event channel that serializes
//! live events into the merge. One session per screen; sessions are never
//! shared.
//!
//! ## Serialization
//!
//! Every merge, page ingestion or live event alike, runs under `&mut self`,
//! and live events only enter the view when the session drains its event
//! channel. No two merges for one view can interleave.
//!
//! ## Teardown
//!
//! [`end`](CollectionSession::end) bumps the session epoch and aborts all
//! subscription forwarders. An event that was already in flight carries
//! the old epoch and is discarded, never applied to the ended view.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use stockpile_core::{session_span, DocumentEvent, RemoteStore};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::registry::{SubscriptionMessage, SubscriptionRegistry};
use crate::sites::CollectionBinding;
use crate::view::{MaterializedView, ViewEffect, ViewEntry};

/// An immutable, fully materialized view snapshot.
pub type Snapshot = Arc<Vec<ViewEntry>>;

/// One screen's live mirror of a remote collection.
pub struct CollectionSession<S: RemoteStore> {
    store: Arc<S>,
    binding: CollectionBinding,
    fetcher: PageFetcher,
    view: MaterializedView,
    registry: SubscriptionRegistry,
    events_tx: mpsc::UnboundedSender<SubscriptionMessage>,
    events_rx: mpsc::UnboundedReceiver<SubscriptionMessage>,
    snapshot_tx: watch::Sender<Snapshot>,
    snapshot_rx: watch::Receiver<Snapshot>,
    epoch: u64,
    closed: bool,
}

impl<S: RemoteStore> CollectionSession<S> {
    /// Starts a session over the given binding.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration fails
    /// validation.
    pub fn new(store: Arc<S>, binding: CollectionBinding, config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = PageFetcher::new(
            binding.collection().clone(),
            binding.order_field(),
            config.page_size,
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        Ok(Self {
            store,
            binding,
            fetcher,
            view: MaterializedView::new(),
            registry: SubscriptionRegistry::new(),
            events_tx,
            events_rx,
            snapshot_tx,
            snapshot_rx,
            epoch: 0,
            closed: false,
        })
    }

    /// Loads the next page into the view and opens subscriptions for every
    /// newly seen document. Returns `false` once the collection is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// A fetch failure leaves the pagination state untouched, so the call
    /// may be retried. A subscription-open failure drops the affected
    /// entries from the view (the invariant that every present entry has a
    /// subscription holds) and rewinds the cursor over them, so a retry
    /// re-fetches and re-delivers exactly those documents.
    pub async fn load_next_page(&mut self) -> Result<bool> {
        let span = session_span("load_next_page", self.binding.collection().as_str());
        async {
            self.ensure_open()?;
            self.drain_events();
            let checkpoint = self.fetcher.checkpoint();
            let page = self.fetcher.fetch_next(self.store.as_ref()).await?;
            tracing::debug!(documents = page.len(), "page fetched");

            let effects = self.view.ingest_page(page);
            let result = self.run_effects(effects).await;
            if result.is_err() {
                // Entries dropped over a failed open must be fetched again;
                // already-present entries are tolerated on the re-ingest.
                self.fetcher.rewind(checkpoint);
            }
            self.publish();
            result?;
            Ok(!self.fetcher.reached_end())
        }
        .instrument(span)
        .await
    }

    /// Applies all live events queued since the last merge.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` after [`end`](Self::end).
    pub fn apply_pending_events(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.drain_events() {
            self.publish();
        }
        Ok(())
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A channel of snapshots, one per state transition. UI consumers
    /// watch this instead of polling.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Returns true if a subscription is currently open for the id.
    #[must_use]
    pub fn is_subscribed(&self, id: &stockpile_core::DocumentId) -> bool {
        self.registry.is_open(id)
    }

    /// Full reload: clears the view, closes all subscriptions, rewinds
    /// pagination, and behaves as at initial creation.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` after [`end`](Self::end).
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.epoch += 1;
        self.registry.close_all();
        self.view.clear();
        self.fetcher.reset();
        self.discard_queued_events();
        self.publish();
        Ok(())
    }

    /// Ends the session: closes every subscription and rejects all further
    /// operations. Idempotent.
    pub fn end(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.epoch += 1;
        self.registry.close_all();
        self.discard_queued_events();
        tracing::debug!(
            collection = self.binding.collection().as_str(),
            "session ended"
        );
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    /// Applies queued live events to the view. Returns true if any merge
    /// happened.
    fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.events_rx.try_recv() {
            if message.epoch != self.epoch {
                // Stale: emitted before a reset or end.
                continue;
            }
            match message.event {
                DocumentEvent::Snapshot {
                    exists: true,
                    fields,
                } => {
                    self.view.apply_live_update(message.id, fields);
                    changed = true;
                }
                DocumentEvent::Snapshot { exists: false, .. } => {
                    let effects = self.view.apply_live_delete(&message.id);
                    changed |= !effects.is_empty();
                    for effect in effects {
                        if let ViewEffect::CloseSubscription(id) = effect {
                            self.registry.close(&id);
                        }
                    }
                }
                DocumentEvent::StreamError { message: detail } => {
                    // Transient stream condition; the subscription stays
                    // open and the backend re-delivers on recovery.
                    tracing::debug!(error = %detail, id = %message.id, "subscription stream error absorbed");
                }
            }
        }
        changed
    }

    async fn run_effects(&mut self, effects: Vec<ViewEffect>) -> Result<()> {
        let mut failure: Option<Error> = None;
        for effect in effects {
            match effect {
                ViewEffect::OpenSubscription(id) => {
                    if failure.is_some() {
                        // An earlier open failed; entries without a
                        // subscription must not stay in the view.
                        self.view.apply_live_delete(&id);
                        continue;
                    }
                    let doc = self.binding.collection().doc(id.clone());
                    if let Err(error) = self
                        .registry
                        .open(self.store.as_ref(), &doc, self.epoch, &self.events_tx)
                        .await
                    {
                        self.view.apply_live_delete(&id);
                        failure = Some(error.into());
                    }
                }
                ViewEffect::CloseSubscription(id) => self.registry.close(&id),
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn publish(&mut self) {
        let _ = self.snapshot_tx.send_replace(Arc::new(self.view.snapshot()));
    }

    fn discard_queued_events(&mut self) {
        while self.events_rx.try_recv().is_ok() {}
    }
}

impl<S: RemoteStore> Drop for CollectionSession<S> {
    fn drop(&mut self) {
        self.end();
    }
}
