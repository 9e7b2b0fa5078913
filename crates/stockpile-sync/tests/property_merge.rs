//! Property tests for the materialized view merge.
//!
//! Random interleavings of page ingestion, live updates, and live deletes
//! are replayed against both [`MaterializedView`] and a naive list model.
//! The view must agree with the model on membership, order, and field
//! contents, and its subscription effects must balance.

use std::collections::HashSet;

use proptest::prelude::*;

use stockpile_core::document::fields;
use stockpile_core::{Document, DocumentId, FieldValue, Fields};
use stockpile_sync::{MaterializedView, ViewEffect};

#[derive(Debug, Clone)]
enum Op {
    /// A fetched page of documents, in server order.
    Page(Vec<(u8, i64)>),
    /// A subscription snapshot for one document.
    Update(u8, i64),
    /// A subscription delete for one document.
    Delete(u8),
}

fn doc_id(n: u8) -> DocumentId {
    DocumentId::new(format!("doc-{n}")).unwrap()
}

fn doc(n: u8, qty: i64) -> Document {
    Document::new(doc_id(n)).with_field(fields::QUANTITY, FieldValue::Int(qty))
}

fn doc_fields(qty: i64) -> Fields {
    [(fields::QUANTITY.to_string(), FieldValue::Int(qty))].into()
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec((0u8..8, 0i64..1000), 1..5).prop_map(Op::Page),
        (0u8..8, 0i64..1000).prop_map(|(n, qty)| Op::Update(n, qty)),
        (0u8..8).prop_map(Op::Delete),
    ]
}

/// Naive reference model: an ordered assoc list with a live flag per id.
#[derive(Default)]
struct Model {
    entries: Vec<(u8, i64, bool)>,
}

impl Model {
    fn position(&self, n: u8) -> Option<usize> {
        self.entries.iter().position(|(id, _, _)| *id == n)
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Page(docs) => {
                for &(n, qty) in docs {
                    match self.position(n) {
                        Some(pos) if !self.entries[pos].2 => self.entries[pos].1 = qty,
                        Some(_) => {}
                        None => self.entries.push((n, qty, false)),
                    }
                }
            }
            Op::Update(n, qty) => match self.position(*n) {
                Some(pos) => {
                    self.entries[pos].1 = *qty;
                    self.entries[pos].2 = true;
                }
                None => self.entries.push((*n, *qty, true)),
            },
            Op::Delete(n) => {
                if let Some(pos) = self.position(*n) {
                    self.entries.remove(pos);
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn merge_agrees_with_naive_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut view = MaterializedView::new();
        let mut model = Model::default();
        let mut opens = 0i64;
        let mut closes = 0i64;

        for op in &ops {
            let effects = match op {
                Op::Page(docs) => {
                    view.ingest_page(docs.iter().map(|&(n, qty)| doc(n, qty)).collect())
                }
                Op::Update(n, qty) => {
                    view.apply_live_update(doc_id(*n), doc_fields(*qty));
                    Vec::new()
                }
                Op::Delete(n) => view.apply_live_delete(&doc_id(*n)),
            };
            model.apply(op);

            for effect in &effects {
                match effect {
                    ViewEffect::OpenSubscription(_) => opens += 1,
                    ViewEffect::CloseSubscription(_) => closes += 1,
                }
            }

            // Ids are unique at every intermediate state.
            let ids: Vec<_> = view.entries().iter().map(|e| e.id.clone()).collect();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }

        // Same membership, same order, same fields, same liveness.
        prop_assert_eq!(view.len(), model.entries.len());
        for (entry, &(n, qty, live)) in view.entries().iter().zip(&model.entries) {
            prop_assert_eq!(&entry.id, &doc_id(n));
            prop_assert_eq!(entry.fields.get(fields::QUANTITY), Some(&FieldValue::Int(qty)));
            prop_assert_eq!(entry.is_live(), live);
        }

        // Opens come only from page appends, closes from removals of any
        // entry. The net open count can never exceed the entries that are
        // actually present.
        prop_assert!(opens - closes <= view.len() as i64);
    }

    #[test]
    fn delete_then_repage_reappends_at_tail(n in 0u8..8, qty in 0i64..1000) {
        let mut view = MaterializedView::new();
        view.ingest_page(vec![doc(n, qty), doc(n.wrapping_add(1) % 8, qty)]);
        view.apply_live_delete(&doc_id(n));

        let effects = view.ingest_page(vec![doc(n, qty + 1)]);
        prop_assert_eq!(effects, vec![ViewEffect::OpenSubscription(doc_id(n))]);
        let last = view.entries().last().unwrap();
        prop_assert_eq!(&last.id, &doc_id(n));
    }
}
