//! Collection bindings for the three view call sites.
//!
//! A [`CollectionBinding`] pairs a collection path with its designated sort
//! field. All three screens of the client are instances of the same session
//! engine over different bindings.

use stockpile_core::document::fields;
use stockpile_core::{CollectionPath, DocumentId, GroupRole, InventoryPaths};

use crate::view::ViewEntry;

/// A collection plus the field its view is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionBinding {
    collection: CollectionPath,
    order_field: String,
}

impl CollectionBinding {
    /// Creates a binding over an arbitrary collection.
    #[must_use]
    pub fn new(collection: CollectionPath, order_field: impl Into<String>) -> Self {
        Self {
            collection,
            order_field: order_field.into(),
        }
    }

    /// The bound collection.
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// The designated sort field.
    #[must_use]
    pub fn order_field(&self) -> &str {
        &self.order_field
    }

    /// A user's private item list, ordered by item name.
    #[must_use]
    pub fn user_items(user_id: &DocumentId) -> Self {
        Self::new(InventoryPaths::user_items(user_id), fields::NAME)
    }

    /// A group's shared item list, ordered by item name.
    #[must_use]
    pub fn group_items(group_id: &DocumentId) -> Self {
        Self::new(InventoryPaths::group_items(group_id), fields::NAME)
    }

    /// A group's membership list, ordered by member display name.
    #[must_use]
    pub fn group_members(group_id: &DocumentId) -> Self {
        Self::new(InventoryPaths::group_members(group_id), fields::DISPLAY_NAME)
    }
}

/// Decodes the role off a membership view entry.
///
/// Unrecognized or missing role values deliberately fall back to
/// [`GroupRole::Member`] (see [`GroupRole::decode`]).
#[must_use]
pub fn member_role(entry: &ViewEntry) -> GroupRole {
    GroupRole::decode(entry.fields.get(fields::ROLE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[test]
    fn bindings_use_the_canonical_paths() {
        let binding = CollectionBinding::user_items(&id("u1"));
        assert_eq!(binding.collection().as_str(), "users/u1/items");
        assert_eq!(binding.order_field(), "name");

        let binding = CollectionBinding::group_members(&id("g1"));
        assert_eq!(binding.collection().as_str(), "groups/g1/members");
        assert_eq!(binding.order_field(), "display_name");

        let binding = CollectionBinding::group_items(&id("g1"));
        assert_eq!(binding.collection().as_str(), "groups/g1/items");
    }
}
