//! # stockpile-sync
//!
//! The two engines behind the Stockpile inventory client:
//!
//! - **Collection synchronization**: [`session::CollectionSession`] keeps an
//!   ordered, deduplicated in-memory projection of a remote collection up to
//!   date under two simultaneously active sources, a cursor-paginated bulk
//!   fetch ([`fetcher::PageFetcher`]) and per-document live subscriptions
//!   ([`registry::SubscriptionRegistry`]), merged through a single pure
//!   state machine ([`view::MaterializedView`]).
//! - **Cascading deletion**: [`delete::CascadingDeleter`] removes an entire
//!   dependent object graph in size-bounded atomic batches, following a
//!   declarative [`plan::DeletionPlan`]. Every step is idempotent, so a
//!   partially completed deletion is always safe to re-run from scratch.
//!
//! Both engines are reused across the three call sites in [`sites`]:
//! user-private item lists, group item lists, and group membership lists.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod delete;
pub mod error;
pub mod fanout;
pub mod fetcher;
pub mod plan;
pub mod registry;
pub mod session;
pub mod sites;
pub mod view;

pub use config::SyncConfig;
pub use delete::{BatchWriter, CascadingDeleter};
pub use error::{Error, Result};
pub use fanout::FanoutIndexMaintainer;
pub use fetcher::PageFetcher;
pub use plan::{group_deletion_plan, user_deletion_plan, DeletionPlan, PlanStep};
pub use registry::SubscriptionRegistry;
pub use session::CollectionSession;
pub use sites::{member_role, CollectionBinding};
pub use view::{MaterializedView, ViewEffect, ViewEntry};
