//! Fan-out membership index maintenance.
//!
//! The per-member reverse index (`users/{uid}/memberships/{gid}`) is a
//! read optimization, not a source of truth: the canonical record lives
//! under `groups/{gid}/members/{uid}`. Writes here are merge-only and
//! best-effort. Deleting index entries is not this component's job: the
//! deletion plan covers them, so the two failure domains cannot diverge.

use stockpile_core::document::fields;
use stockpile_core::{
    DocumentId, FieldValue, Fields, GroupRole, InventoryPaths, RemoteStore, WriteOp,
};

use crate::error::Result;

/// Keeps the membership reverse index consistent with the canonical
/// membership records.
#[derive(Debug)]
pub struct FanoutIndexMaintainer<'a, S: RemoteStore> {
    store: &'a S,
}

impl<'a, S: RemoteStore> FanoutIndexMaintainer<'a, S> {
    /// Creates a maintainer over the given store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Best-effort merge write of one index record.
    ///
    /// A failed write is logged and otherwise ignored; the canonical
    /// membership record is unaffected and a later
    /// [`ensure_owner_indexed`](Self::ensure_owner_indexed) or re-upsert
    /// heals the index.
    pub async fn upsert(&self, member_id: &DocumentId, group_id: &DocumentId, role: GroupRole) {
        let index = InventoryPaths::membership(member_id, group_id);
        let result = self
            .store
            .commit(vec![WriteOp::SetMerge {
                target: index.clone(),
                fields: Self::index_fields(group_id, role),
            }])
            .await;
        if let Err(error) = result {
            tracing::warn!(%error, index = %index, "membership index upsert failed");
        }
    }

    /// Heals the owner's index entry if group creation did not write it.
    ///
    /// Run once per session start for membership-list call sites: reads
    /// the entry and merge-writes it only when missing.
    ///
    /// # Errors
    ///
    /// Propagates read or write failures; the caller decides whether to
    /// retry at next session start.
    pub async fn ensure_owner_indexed(
        &self,
        owner_id: &DocumentId,
        group_id: &DocumentId,
    ) -> Result<()> {
        let index = InventoryPaths::membership(owner_id, group_id);
        if self.store.get(&index).await?.is_some() {
            return Ok(());
        }
        tracing::info!(index = %index, "owner membership index missing, healing");
        self.store
            .commit(vec![WriteOp::SetMerge {
                target: index,
                fields: Self::index_fields(group_id, GroupRole::Owner),
            }])
            .await?;
        Ok(())
    }

    fn index_fields(group_id: &DocumentId, role: GroupRole) -> Fields {
        Fields::from([
            (
                fields::GROUP_ID.to_string(),
                FieldValue::Str(group_id.as_str().to_string()),
            ),
            (
                fields::ROLE.to_string(),
                FieldValue::Str(role.as_str().to_string()),
            ),
            (fields::INDEXED_AT.to_string(), FieldValue::ServerTimestamp),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::MemoryStore;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn upsert_writes_merge_record() {
        let store = MemoryStore::new();
        let maintainer = FanoutIndexMaintainer::new(&store);

        maintainer.upsert(&id("u1"), &id("g1"), GroupRole::Editor).await;

        let doc = store
            .get(&InventoryPaths::membership(&id("u1"), &id("g1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.field(fields::ROLE).unwrap().as_str(), Some("editor"));
        assert_eq!(doc.field(fields::GROUP_ID).unwrap().as_str(), Some("g1"));
        assert!(matches!(
            doc.field(fields::INDEXED_AT),
            Some(FieldValue::Timestamp(_))
        ));
    }

    #[tokio::test]
    async fn ensure_owner_indexed_heals_only_when_missing() {
        let store = MemoryStore::new();
        let maintainer = FanoutIndexMaintainer::new(&store);

        maintainer.ensure_owner_indexed(&id("u1"), &id("g1")).await.unwrap();
        let commits_after_heal = store.commit_count();
        assert_eq!(commits_after_heal, 1);

        let doc = store
            .get(&InventoryPaths::membership(&id("u1"), &id("g1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.field(fields::ROLE).unwrap().as_str(), Some("owner"));

        // Second run reads, finds the record, writes nothing.
        maintainer.ensure_owner_indexed(&id("u1"), &id("g1")).await.unwrap();
        assert_eq!(store.commit_count(), commits_after_heal);
    }
}
