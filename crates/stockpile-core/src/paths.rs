//! Canonical document paths for the inventory data model.
//!
//! This module is the single source of truth for the remote path scheme.
//! All engines construct paths through [`InventoryPaths`]; no hardcoded
//! path strings exist outside this module.
//!
//! # Path Layout
//!
//! ```text
//! users/{user_id}                          user root record
//! users/{user_id}/items/{item_id}          private item list
//! users/{user_id}/memberships/{group_id}   fan-out reverse index
//! groups/{group_id}                        group root record
//! groups/{group_id}/items/{item_id}        shared item list
//! groups/{group_id}/members/{user_id}      canonical membership records
//! ```
//!
//! A collection path has an odd number of segments, a document path an even
//! number. Ids never contain `/` (enforced by [`DocumentId`]), so paths
//! built from validated ids are valid by construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::error::{Error, Result};

/// A named set of documents under a parent path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parses a collection path from a raw string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any segment is empty or the segment
    /// count is even (which would address a document, not a collection).
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidInput(format!(
                "collection path has empty segment: {path}"
            )));
        }
        if segments.len() % 2 == 0 {
            return Err(Error::InvalidInput(format!(
                "collection path must have an odd segment count: {path}"
            )));
        }
        Ok(Self(path))
    }

    /// Builds a path from pre-validated components, skipping re-validation.
    fn from_validated(path: String) -> Self {
        debug_assert!(path.split('/').count() % 2 == 1);
        Self(path)
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a reference to the document with the given id in this
    /// collection.
    #[must_use]
    pub fn doc(&self, id: DocumentId) -> DocumentRef {
        DocumentRef {
            collection: self.clone(),
            id,
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a single document: its collection plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    collection: CollectionPath,
    id: DocumentId,
}

impl DocumentRef {
    /// Creates a document reference.
    #[must_use]
    pub const fn new(collection: CollectionPath, id: DocumentId) -> Self {
        Self { collection, id }
    }

    /// Returns the collection this document belongs to.
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// Returns the document id.
    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Returns the full slash-joined document path.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection.as_str(), self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Canonical path generator for the inventory data model.
pub struct InventoryPaths;

impl InventoryPaths {
    /// The top-level users collection.
    #[must_use]
    pub fn users() -> CollectionPath {
        CollectionPath::from_validated("users".into())
    }

    /// The top-level groups collection.
    #[must_use]
    pub fn groups() -> CollectionPath {
        CollectionPath::from_validated("groups".into())
    }

    /// A user's root record.
    #[must_use]
    pub fn user_doc(user_id: &DocumentId) -> DocumentRef {
        Self::users().doc(user_id.clone())
    }

    /// A group's root record.
    #[must_use]
    pub fn group_doc(group_id: &DocumentId) -> DocumentRef {
        Self::groups().doc(group_id.clone())
    }

    /// A user's private item list.
    #[must_use]
    pub fn user_items(user_id: &DocumentId) -> CollectionPath {
        CollectionPath::from_validated(format!("users/{user_id}/items"))
    }

    /// A group's shared item list.
    #[must_use]
    pub fn group_items(group_id: &DocumentId) -> CollectionPath {
        CollectionPath::from_validated(format!("groups/{group_id}/items"))
    }

    /// A group's canonical membership records.
    #[must_use]
    pub fn group_members(group_id: &DocumentId) -> CollectionPath {
        CollectionPath::from_validated(format!("groups/{group_id}/members"))
    }

    /// A user's membership reverse index ("which groups does this user
    /// belong to, and with what role").
    #[must_use]
    pub fn memberships(user_id: &DocumentId) -> CollectionPath {
        CollectionPath::from_validated(format!("users/{user_id}/memberships"))
    }

    /// A single reverse-index record for one (user, group) pair.
    #[must_use]
    pub fn membership(user_id: &DocumentId, group_id: &DocumentId) -> DocumentRef {
        Self::memberships(user_id).doc(group_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[test]
    fn collection_path_validation() {
        assert!(CollectionPath::new("users").is_ok());
        assert!(CollectionPath::new("users/u1/items").is_ok());
        // even segment count addresses a document
        assert!(CollectionPath::new("users/u1").is_err());
        assert!(CollectionPath::new("users//items").is_err());
        assert!(CollectionPath::new("").is_err());
    }

    #[test]
    fn document_ref_path_joins_segments() {
        let r = InventoryPaths::group_items(&id("g1")).doc(id("item-9"));
        assert_eq!(r.path(), "groups/g1/items/item-9");
        assert_eq!(r.id().as_str(), "item-9");
    }

    #[test]
    fn membership_index_path() {
        let r = InventoryPaths::membership(&id("u7"), &id("g2"));
        assert_eq!(r.path(), "users/u7/memberships/g2");
    }

    #[test]
    fn root_docs() {
        assert_eq!(InventoryPaths::group_doc(&id("g1")).path(), "groups/g1");
        assert_eq!(InventoryPaths::user_doc(&id("u1")).path(), "users/u1");
    }
}
