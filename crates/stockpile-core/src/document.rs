//! The document data model.
//!
//! A [`Document`] is an opaque string identifier plus a mapping from field
//! name to typed value. Identity is immutable; fields are mutable. Documents
//! live in collections (see [`crate::paths`]) and are enumerated in an order
//! defined by a designated sort field with the id as tiebreaker, which is
//! why [`FieldValue`] carries a total order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Well-known field names used by the inventory document schema.
pub mod fields {
    /// Display name of an item or member.
    pub const NAME: &str = "name";
    /// Item quantity on hand.
    pub const QUANTITY: &str = "quantity";
    /// Id of the user that owns a group.
    pub const OWNER_ID: &str = "owner_id";
    /// Membership role (see [`crate::role::GroupRole`]).
    pub const ROLE: &str = "role";
    /// Display name on a membership record.
    pub const DISPLAY_NAME: &str = "display_name";
    /// Group id duplicated onto a reverse-index record.
    pub const GROUP_ID: &str = "group_id";
    /// Server timestamp set when an index record was last written.
    pub const INDEXED_AT: &str = "indexed_at";
}

/// A unique identifier for a document.
///
/// Ids are opaque strings assigned by the backend or minted client-side via
/// [`DocumentId::generate`]. They never contain path separators, so they can
/// be embedded in document paths without escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a document id from a raw string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the string is empty or contains `/`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput("document id must not be empty".into()));
        }
        if id.contains('/') {
            return Err(Error::InvalidInput(format!(
                "document id must not contain '/': {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Mints a new unique document id.
    ///
    /// Uses ULID generation: lexicographically sortable by creation time,
    /// globally unique without coordination, and URL-safe.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A typed document field value.
///
/// `ServerTimestamp` is a write-side sentinel: the backend resolves it to the
/// commit-time [`FieldValue::Timestamp`] when a batch is applied, so it never
/// appears in read results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// The explicit null value.
    Null,
    /// A 64-bit signed integer.
    Int(i64),
    /// A UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// A UTF-8 string.
    Str(String),
    /// Sentinel resolved to the server-side commit time.
    ServerTimestamp,
}

impl FieldValue {
    /// Rank used to order values of different types.
    ///
    /// `Null < Int < Timestamp < Str`; the write-only sentinel sorts last.
    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) => 1,
            Self::Timestamp(_) => 2,
            Self::Str(_) => 3,
            Self::ServerTimestamp => 4,
        }
    }

    /// Returns the string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A document's field map.
///
/// `BTreeMap` keeps iteration deterministic, which matters for snapshot
/// comparisons in tests.
pub type Fields = std::collections::BTreeMap<String, FieldValue>;

/// A single addressable record in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The document's identity within its collection.
    pub id: DocumentId,
    /// The document's current field values.
    pub fields: Fields,
}

impl Document {
    /// Creates a document with no fields.
    #[must_use]
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            fields: Fields::new(),
        }
    }

    /// Adds a field, consuming and returning the document (builder style).
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the value used to order this document by `order_field`.
    ///
    /// Missing fields sort as [`FieldValue::Null`], i.e. before everything.
    #[must_use]
    pub fn order_key(&self, order_field: &str) -> FieldValue {
        self.fields
            .get(order_field)
            .cloned()
            .unwrap_or(FieldValue::Null)
    }
}
