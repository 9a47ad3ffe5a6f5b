//! The permission store: composite identities, upserts and lookups over a
//! backing [`Store`].
//!
//! Writes use the full (entity ∪ resource) identity. Lookups index only on
//! the first declared attribute of each descriptor, so a multi-attribute
//! descriptor still writes a multi-attribute identity but is found by its
//! leading attribute alone.

use std::collections::BTreeSet;

use keyward_core::{Descriptor, Identity, Level, PermissionRecord, Predicate, ResourceFilter};
use keyward_store::{now_millis, BulkWriteResult, Query, Sort, Store, StoreExt, WriteOp};

use crate::config::DescriptorPolicy;
use crate::error::{AclError, Result};

/// One `(entity, resource, level)` triple for [`PermissionStore::upsert_many`].
///
/// A negative level deletes the record instead of storing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub entity: Descriptor,
    pub resource: Descriptor,
    pub level: Level,
}

impl Assignment {
    pub fn new(entity: Descriptor, resource: Descriptor, level: Level) -> Self {
        Self {
            entity,
            resource,
            level,
        }
    }

    /// The identity this assignment targets.
    pub fn identity(&self) -> Identity {
        Identity::merge(&self.entity, &self.resource)
    }

    fn into_op(self, now: i64) -> WriteOp {
        let id = self.identity();
        if self.level.is_storable() {
            WriteOp::upsert(id, self.level, now)
        } else {
            WriteOp::delete(id)
        }
    }
}

/// Persists and mutates permission records in a backing store.
///
/// Holds no permission state of its own; everything lives in the store.
pub struct PermissionStore<S: Store> {
    store: S,
    policy: DescriptorPolicy,
}

impl<S: Store> PermissionStore<S> {
    /// Create a permission store with the lenient descriptor policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, DescriptorPolicy::Lenient)
    }

    pub fn with_policy(store: S, policy: DescriptorPolicy) -> Self {
        Self { store, policy }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upsert or delete every assignment in one ordered batch, stamped now.
    pub async fn upsert_many(&self, pairs: Vec<Assignment>) -> Result<BulkWriteResult> {
        self.upsert_many_at(pairs, now_millis()).await
    }

    /// Upsert or delete every assignment in one ordered batch.
    ///
    /// Levels `>= 0` upsert (`created_at` only on insert, `modified_at`
    /// always); negative levels delete. An empty batch is a no-op. A store
    /// failure part-way is returned as one error; ops already committed by
    /// the store stay committed.
    pub async fn upsert_many_at(&self, pairs: Vec<Assignment>, now: i64) -> Result<BulkWriteResult> {
        if pairs.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let ops: Vec<WriteOp> = pairs.into_iter().map(|a| a.into_op(now)).collect();
        let count = ops.len();
        let result = self.store.bulk_write(ops).await?;

        tracing::debug!(
            ops = count,
            inserted = result.inserted,
            updated = result.updated,
            deleted = result.deleted,
            "permissions written"
        );
        Ok(result)
    }

    /// Level held by `entity` on `resource`, or `Level::ABSENT`.
    ///
    /// Matches on the first declared attribute of each descriptor only.
    pub async fn find_one(&self, entity: &Descriptor, resource: &Descriptor) -> Result<Level> {
        let mut predicates = Vec::with_capacity(2);
        predicates.extend(self.leading_predicate(entity, "entity")?);
        predicates.extend(self.leading_predicate(resource, "resource")?);
        Ok(self.store.find_level(&predicates).await?)
    }

    /// Records held by `entity`, narrowed by `resource` and `extra`.
    ///
    /// Results are ordered by the resource portion of the identity, i.e.
    /// every attribute not named in `entity`.
    pub async fn find(
        &self,
        entity: &Descriptor,
        resource: &ResourceFilter,
        extra: &[Predicate],
    ) -> Result<Vec<PermissionRecord>> {
        let mut predicates = Vec::with_capacity(2 + extra.len());
        predicates.extend(self.leading_predicate(entity, "entity")?);
        predicates.extend(resource.to_predicate());
        predicates.extend_from_slice(extra);

        let entity_keys: BTreeSet<String> = entity.keys().map(String::from).collect();
        let query = Query::new(predicates).sorted(Sort::ResourceAscending { entity_keys });
        Ok(self.store.find(&query).await?)
    }

    /// Delete the record for the full (entity ∪ resource) identity.
    ///
    /// Removing an absent record is not an error. Returns whether a record
    /// was deleted.
    pub async fn remove(&self, entity: &Descriptor, resource: &Descriptor) -> Result<bool> {
        self.check_descriptor(entity, "entity")?;
        self.check_descriptor(resource, "resource")?;

        let id = Identity::merge(entity, resource);
        let removed = self.store.delete_one(&id).await?;
        tracing::debug!(removed, "permission removed");
        Ok(removed)
    }

    fn check_descriptor(&self, descriptor: &Descriptor, role: &str) -> Result<()> {
        if descriptor.is_empty() && self.policy == DescriptorPolicy::Strict {
            return Err(AclError::MalformedInput(format!("empty {} descriptor", role)));
        }
        Ok(())
    }

    fn leading_predicate(&self, descriptor: &Descriptor, role: &str) -> Result<Option<Predicate>> {
        self.check_descriptor(descriptor, role)?;
        Ok(Predicate::first_attr_of(descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::Scalar;
    use keyward_store::MemoryStore;

    fn account(id: &str) -> Descriptor {
        Descriptor::single("account", id)
    }

    fn doc(id: &str) -> Descriptor {
        Descriptor::single("doc", id)
    }

    #[tokio::test]
    async fn test_upsert_many_inserts_and_updates() {
        let perms = PermissionStore::new(MemoryStore::new());

        let r1 = perms
            .upsert_many_at(vec![Assignment::new(account("a1"), doc("d1"), Level::READ)], 100)
            .await
            .unwrap();
        assert_eq!(r1.inserted, 1);

        let r2 = perms
            .upsert_many_at(vec![Assignment::new(account("a1"), doc("d1"), Level::OWNER)], 200)
            .await
            .unwrap();
        assert_eq!(r2.updated, 1);

        let records = perms.store().snapshot().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::OWNER);
        assert_eq!(records[0].created_at, 100);
        assert_eq!(records[0].modified_at, 200);
    }

    #[tokio::test]
    async fn test_negative_level_deletes() {
        let perms = PermissionStore::new(MemoryStore::new());
        perms
            .upsert_many_at(vec![Assignment::new(account("a1"), doc("d1"), Level::WRITE)], 1)
            .await
            .unwrap();

        let result = perms
            .upsert_many_at(vec![Assignment::new(account("a1"), doc("d1"), Level::ABSENT)], 2)
            .await
            .unwrap();
        assert_eq!(result.deleted, 1);
        assert!(perms.store().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let perms = PermissionStore::new(MemoryStore::new());
        let result = perms.upsert_many(Vec::new()).await.unwrap();
        assert_eq!(result, BulkWriteResult::default());
    }

    #[tokio::test]
    async fn test_find_one_absent() {
        let perms = PermissionStore::new(MemoryStore::new());
        let level = perms.find_one(&account("a1"), &doc("d1")).await.unwrap();
        assert_eq!(level, Level::ABSENT);
    }

    #[tokio::test]
    async fn test_find_one_uses_leading_attributes_only() {
        let perms = PermissionStore::new(MemoryStore::new());
        let resource = Descriptor::new().with("doc", "d1").with("tab", "t1");
        perms
            .upsert_many_at(vec![Assignment::new(account("a1"), resource, Level::WRITE)], 1)
            .await
            .unwrap();

        // The second attribute is ignored, even when it disagrees.
        let probe = Descriptor::new().with("doc", "d1").with("tab", "other");
        let level = perms.find_one(&account("a1"), &probe).await.unwrap();
        assert_eq!(level, Level::WRITE);
    }

    #[tokio::test]
    async fn test_find_orders_by_resource_portion() {
        let perms = PermissionStore::new(MemoryStore::new());
        perms
            .upsert_many_at(
                vec![
                    Assignment::new(account("a1"), doc("c"), Level::READ),
                    Assignment::new(account("a1"), doc("a"), Level::READ),
                    Assignment::new(account("a1"), doc("b"), Level::READ),
                ],
                1,
            )
            .await
            .unwrap();

        let records = perms
            .find(&account("a1"), &ResourceFilter::NoFilter, &[])
            .await
            .unwrap();
        let docs: Vec<_> = records.iter().map(|r| r.id.get("doc").cloned()).collect();
        assert_eq!(
            docs,
            vec![
                Some(Scalar::from("a")),
                Some(Scalar::from("b")),
                Some(Scalar::from("c"))
            ]
        );
    }

    #[tokio::test]
    async fn test_lenient_empty_entity_matches_broadly() {
        let perms = PermissionStore::new(MemoryStore::new());
        perms
            .upsert_many_at(
                vec![
                    Assignment::new(account("a1"), doc("d1"), Level::READ),
                    Assignment::new(account("a2"), doc("d1"), Level::OWNER),
                ],
                1,
            )
            .await
            .unwrap();

        let records = perms
            .find(&Descriptor::new(), &ResourceFilter::from("doc"), &[])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_strict_rejects_empty_descriptors() {
        let perms = PermissionStore::with_policy(MemoryStore::new(), DescriptorPolicy::Strict);

        let err = perms.find_one(&account("a1"), &Descriptor::new()).await.unwrap_err();
        assert!(matches!(err, AclError::MalformedInput(_)));

        let err = perms
            .find(&Descriptor::new(), &ResourceFilter::NoFilter, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AclError::MalformedInput(_)));

        let err = perms.remove(&Descriptor::new(), &doc("d1")).await.unwrap_err();
        assert!(matches!(err, AclError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let perms = PermissionStore::new(MemoryStore::new());
        perms
            .upsert_many_at(vec![Assignment::new(account("a1"), doc("d1"), Level::READ)], 1)
            .await
            .unwrap();

        assert!(perms.remove(&account("a1"), &doc("d1")).await.unwrap());
        assert!(!perms.remove(&account("a1"), &doc("d1")).await.unwrap());
        assert!(!perms.remove(&account("nobody"), &doc("d9")).await.unwrap());
    }
}
