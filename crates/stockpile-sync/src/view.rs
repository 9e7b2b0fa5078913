//! The materialized view merge state machine.
//!
//! [`MaterializedView`] is the ordered, deduplicated projection that both
//! the page fetcher and the subscription registry write into. It is a pure
//! state machine: transitions mutate the entry list and return
//! [`ViewEffect`]s (subscriptions to open or close) for the session layer
//! to execute. Keeping the merge free of I/O makes every interleaving of
//! page ingestion and live events directly testable.
//!
//! ## Invariants
//!
//! - Each document id appears in the ordered entry list at most once.
//! - Ids introduced by pagination keep their relative page order; live
//!   updates replace fields in place, never positions.
//! - Once an entry is marked live (subscription-sourced), page data never
//!   overwrites it: paged data may be older than the subscription stream.

use stockpile_core::{Document, DocumentId, Fields};

/// The materialized projection of one document, as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    /// The document's id.
    pub id: DocumentId,
    /// The document's fields, from the newer of page fetch and
    /// subscription stream.
    pub fields: Fields,
    live: bool,
}

impl ViewEntry {
    /// True once a subscription event has been applied to this entry,
    /// making the subscription stream its authoritative source.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }
}

/// A side effect the session must execute after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// Open a subscription for a newly paginated-in document.
    OpenSubscription(DocumentId),
    /// Close the subscription of a removed document.
    CloseSubscription(DocumentId),
}

/// The ordered, deduplicated in-memory projection of a remote collection.
#[derive(Debug, Default)]
pub struct MaterializedView {
    entries: Vec<ViewEntry>,
}

impl MaterializedView {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one fetched page.
    ///
    /// Unseen documents append at the tail in fetch order and request a
    /// subscription. Documents already present are tolerated (pagination
    /// racing a reorder): their fields are refreshed only while no
    /// subscription event has claimed the entry.
    pub fn ingest_page(&mut self, documents: Vec<Document>) -> Vec<ViewEffect> {
        let mut effects = Vec::new();
        for doc in documents {
            match self.position(&doc.id) {
                Some(pos) => {
                    if !self.entries[pos].live {
                        self.entries[pos].fields = doc.fields;
                    }
                }
                None => {
                    effects.push(ViewEffect::OpenSubscription(doc.id.clone()));
                    self.entries.push(ViewEntry {
                        id: doc.id,
                        fields: doc.fields,
                        live: false,
                    });
                }
            }
        }
        effects
    }

    /// Applies a subscription update for one document.
    ///
    /// Known ids are updated in place, keeping their position. Unknown ids
    /// append at the tail (the document newly matches the view; its
    /// subscription is already open, since the event came from it).
    pub fn apply_live_update(&mut self, id: DocumentId, fields: Fields) {
        match self.position(&id) {
            Some(pos) => {
                self.entries[pos].fields = fields;
                self.entries[pos].live = true;
            }
            None => self.entries.push(ViewEntry {
                id,
                fields,
                live: true,
            }),
        }
    }

    /// Applies a subscription deletion for one document.
    ///
    /// Removes the entry at any position and requests its subscription be
    /// closed. Unknown ids are a no-op.
    pub fn apply_live_delete(&mut self, id: &DocumentId) -> Vec<ViewEffect> {
        match self.position(id) {
            Some(pos) => {
                self.entries.remove(pos);
                vec![ViewEffect::CloseSubscription(id.clone())]
            }
            None => Vec::new(),
        }
    }

    /// Clears all entries (reset protocol).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the current ordered entries.
    #[must_use]
    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    /// Returns a fully materialized, owned snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ViewEntry> {
        self.entries.clone()
    }

    /// Returns true if the given id currently belongs to the view.
    #[must_use]
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.position(id).is_some()
    }

    /// Number of entries in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the view has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::document::fields;
    use stockpile_core::FieldValue;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    fn doc(doc_id: &str, qty: i64) -> Document {
        Document::new(id(doc_id)).with_field(fields::QUANTITY, FieldValue::Int(qty))
    }

    fn qty_fields(qty: i64) -> Fields {
        Fields::from([(fields::QUANTITY.to_string(), FieldValue::Int(qty))])
    }

    fn ids(view: &MaterializedView) -> Vec<&str> {
        view.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn page_ingest_appends_in_fetch_order() {
        let mut view = MaterializedView::new();
        let effects = view.ingest_page(vec![doc("a", 5), doc("b", 2)]);
        assert_eq!(ids(&view), vec!["a", "b"]);
        assert_eq!(
            effects,
            vec![
                ViewEffect::OpenSubscription(id("a")),
                ViewEffect::OpenSubscription(id("b")),
            ]
        );

        // A second page extends the tail and only requests new subscriptions.
        let effects = view.ingest_page(vec![doc("c", 1)]);
        assert_eq!(ids(&view), vec!["a", "b", "c"]);
        assert_eq!(effects, vec![ViewEffect::OpenSubscription(id("c"))]);
    }

    #[test]
    fn duplicate_page_document_does_not_duplicate_entry() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 5)]);
        let effects = view.ingest_page(vec![doc("a", 7)]);
        assert!(effects.is_empty());
        assert_eq!(view.len(), 1);
        // Not yet live, so the refetched fields win.
        assert_eq!(
            view.entries()[0].fields.get(fields::QUANTITY),
            Some(&FieldValue::Int(7))
        );
    }

    #[test]
    fn live_update_replaces_fields_in_place() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 5), doc("b", 2)]);
        view.apply_live_update(id("b"), qty_fields(9));

        assert_eq!(ids(&view), vec!["a", "b"]);
        assert_eq!(
            view.entries()[1].fields.get(fields::QUANTITY),
            Some(&FieldValue::Int(9))
        );
        assert!(view.entries()[1].is_live());
        assert!(!view.entries()[0].is_live());
    }

    #[test]
    fn stale_page_data_never_overwrites_live_entry() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 5)]);
        view.apply_live_update(id("a"), qty_fields(9));
        // Refetch delivers the old value; the live entry keeps the new one.
        view.ingest_page(vec![doc("a", 5)]);
        assert_eq!(
            view.entries()[0].fields.get(fields::QUANTITY),
            Some(&FieldValue::Int(9))
        );
    }

    #[test]
    fn live_update_for_unknown_id_appends_at_tail() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 5)]);
        view.apply_live_update(id("z"), qty_fields(1));
        assert_eq!(ids(&view), vec!["a", "z"]);
        assert!(view.entries()[1].is_live());
    }

    #[test]
    fn live_delete_removes_at_any_position() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 1), doc("b", 2), doc("c", 3)]);

        let effects = view.apply_live_delete(&id("b"));
        assert_eq!(effects, vec![ViewEffect::CloseSubscription(id("b"))]);
        assert_eq!(ids(&view), vec!["a", "c"]);

        // Deleting an unknown id is a no-op.
        assert!(view.apply_live_delete(&id("b")).is_empty());
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn clear_empties_the_view() {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc("a", 1)]);
        view.clear();
        assert!(view.is_empty());
        assert!(!view.contains(&id("a")));
    }
}
