//! Declarative deletion plans.
//!
//! A [`DeletionPlan`] describes, for one root document, every dependent
//! collection and auxiliary index record to remove, in dependency order:
//! children before parents, index records alongside the record that owns
//! them. The plan is pure data; [`crate::delete::CascadingDeleter`]
//! executes it.

use std::fmt;

use stockpile_core::document::fields;
use stockpile_core::{CollectionPath, Document, DocumentId, DocumentRef, InventoryPaths};

/// Derives extra documents to delete from one enumerated (or root)
/// document, e.g. a reverse-index record keyed by a field of that document.
pub type SideEffect = Box<dyn Fn(&Document) -> Vec<DocumentRef> + Send + Sync>;

/// One dependent collection to drain, with an optional per-document side
/// effect.
pub struct PlanStep {
    collection: CollectionPath,
    order_field: String,
    side_effect: Option<SideEffect>,
}

impl PlanStep {
    /// Creates a step draining `collection`, enumerated by `order_field`.
    #[must_use]
    pub fn new(collection: CollectionPath, order_field: impl Into<String>) -> Self {
        Self {
            collection,
            order_field: order_field.into(),
            side_effect: None,
        }
    }

    /// Attaches a per-document side effect.
    #[must_use]
    pub fn with_side_effect(
        mut self,
        effect: impl Fn(&Document) -> Vec<DocumentRef> + Send + Sync + 'static,
    ) -> Self {
        self.side_effect = Some(Box::new(effect));
        self
    }

    /// The collection this step drains.
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// The field used to enumerate the collection.
    #[must_use]
    pub fn order_field(&self) -> &str {
        &self.order_field
    }

    /// The per-document side effect, if any.
    #[must_use]
    pub fn side_effect(&self) -> Option<&SideEffect> {
        self.side_effect.as_ref()
    }
}

impl fmt::Debug for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanStep")
            .field("collection", &self.collection)
            .field("order_field", &self.order_field)
            .field("has_side_effect", &self.side_effect.is_some())
            .finish()
    }
}

/// The full deletion plan for one root document.
pub struct DeletionPlan {
    root: DocumentRef,
    steps: Vec<PlanStep>,
    root_side_effects: Vec<SideEffect>,
}

impl DeletionPlan {
    /// Creates a plan deleting only the root document.
    #[must_use]
    pub fn new(root: DocumentRef) -> Self {
        Self {
            root,
            steps: Vec::new(),
            root_side_effects: Vec::new(),
        }
    }

    /// Appends a dependent-collection step. Steps execute in the order
    /// they are added.
    #[must_use]
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a root-level side effect, evaluated against the root
    /// document's fields after all steps have drained.
    #[must_use]
    pub fn with_root_side_effect(
        mut self,
        effect: impl Fn(&Document) -> Vec<DocumentRef> + Send + Sync + 'static,
    ) -> Self {
        self.root_side_effects.push(Box::new(effect));
        self
    }

    /// The root document to delete last.
    #[must_use]
    pub const fn root(&self) -> &DocumentRef {
        &self.root
    }

    /// The dependent-collection steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// The root-level side effects.
    #[must_use]
    pub fn root_side_effects(&self) -> &[SideEffect] {
        &self.root_side_effects
    }
}

impl fmt::Debug for DeletionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionPlan")
            .field("root", &self.root)
            .field("steps", &self.steps)
            .field("root_side_effects", &self.root_side_effects.len())
            .finish()
    }
}

/// The plan for deleting a group: its item list, then its membership
/// records (each with the member's reverse-index entry), then the owner's
/// reverse-index entry and the group record itself.
///
/// Children go first so a retry after a mid-sequence crash re-enumerates an
/// empty or shrinking collection.
#[must_use]
pub fn group_deletion_plan(group_id: &DocumentId) -> DeletionPlan {
    let member_group = group_id.clone();
    let owner_group = group_id.clone();
    DeletionPlan::new(InventoryPaths::group_doc(group_id))
        .with_step(PlanStep::new(
            InventoryPaths::group_items(group_id),
            fields::NAME,
        ))
        .with_step(
            PlanStep::new(InventoryPaths::group_members(group_id), fields::DISPLAY_NAME)
                .with_side_effect(move |member| {
                    // Membership records are keyed by the member's user id.
                    vec![InventoryPaths::membership(&member.id, &member_group)]
                }),
        )
        .with_root_side_effect(move |root| {
            let owner = root
                .field(fields::OWNER_ID)
                .and_then(stockpile_core::FieldValue::as_str)
                .and_then(|raw| DocumentId::new(raw).ok());
            match owner {
                Some(owner) => vec![InventoryPaths::membership(&owner, &owner_group)],
                None => Vec::new(),
            }
        })
}

/// The plan for deleting a user account's data: the private item list and
/// the membership reverse index, then the user record.
#[must_use]
pub fn user_deletion_plan(user_id: &DocumentId) -> DeletionPlan {
    DeletionPlan::new(InventoryPaths::user_doc(user_id))
        .with_step(PlanStep::new(
            InventoryPaths::user_items(user_id),
            fields::NAME,
        ))
        .with_step(PlanStep::new(
            InventoryPaths::memberships(user_id),
            fields::GROUP_ID,
        ))
}
