//! # stockpile-core
//!
//! Core abstractions for the Stockpile inventory synchronization engines.
//!
//! This crate provides the foundational types and traits shared by the
//! materialized-view sync engine and the cascading deletion engine:
//!
//! - **Document Model**: Opaque-id documents with typed, mutable fields
//! - **Paths**: Strongly-typed collection paths and document references
//! - **Store Contract**: The abstract remote document store (paginated
//!   ordered queries, per-document live subscriptions, bounded atomic
//!   batch writes)
//! - **Reference Backend**: An in-memory store with live subscription
//!   delivery, used by every test in the workspace
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `stockpile-core` is the only crate allowed to define shared primitives.
//! The engines in `stockpile-sync` talk to the backend exclusively through
//! the [`RemoteStore`] contract defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod document;
pub mod error;
pub mod memory;
pub mod observability;
pub mod paths;
pub mod role;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use stockpile_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::document::{fields, Document, DocumentId, FieldValue, Fields};
    pub use crate::error::{Error, Result};
    pub use crate::memory::MemoryStore;
    pub use crate::paths::{CollectionPath, DocumentRef, InventoryPaths};
    pub use crate::role::GroupRole;
    pub use crate::store::{
        DocumentEvent, DocumentWatch, RemoteStore, WriteOp, MAX_BATCH_OPS,
    };
}

// Re-export key types at crate root for ergonomics
pub use document::{Document, DocumentId, FieldValue, Fields};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use observability::{cascade_span, init_logging, session_span, LogFormat};
pub use paths::{CollectionPath, DocumentRef, InventoryPaths};
pub use role::GroupRole;
pub use store::{DocumentEvent, DocumentWatch, RemoteStore, WriteOp, MAX_BATCH_OPS};
