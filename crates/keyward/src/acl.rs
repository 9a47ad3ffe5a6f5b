//! The Acl: named-level facade over the permission store.
//!
//! Callers never hand-write numeric thresholds. Assignments come in four
//! flavours (`all` keeps the caller's level, `read`/`write`/`owner` force
//! 1/2/3), tests resolve to a level or a boolean, and gets filter by a
//! minimum level.

use keyward_core::{
    Descriptor, Level, PermissionRecord, Predicate, Requester, ResourceFilter, Scalar, LEVEL_ATTR,
};
use keyward_store::{now_millis, BulkWriteResult, Store};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::asset::{AssetKind, ServedAsset};
use crate::config::{AclConfig, Consistency};
use crate::error::Result;
use crate::permission_store::{Assignment, PermissionStore};

/// A resource descriptor paired with the level to grant on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub resource: Descriptor,
    pub level: Level,
}

impl Grant {
    pub fn new(resource: Descriptor, level: Level) -> Self {
        Self { resource, level }
    }

    /// Split a descriptor that carries its level inline under `level`.
    ///
    /// Integers are taken as is. An explicit null or `false` grants level 0
    /// and `true` grants level 1. Numeric text is parsed. A missing level
    /// or any other text reads as `Level::ABSENT`, so the assignment
    /// deletes the record.
    pub fn from_descriptor(descriptor: Descriptor) -> Self {
        let level = match descriptor.get(LEVEL_ATTR) {
            Some(Scalar::Int(n)) => Level(*n),
            Some(Scalar::Null) | Some(Scalar::Bool(false)) => Level::NONE,
            Some(Scalar::Bool(true)) => Level::READ,
            Some(Scalar::Text(text)) => text.trim().parse().map(Level).unwrap_or(Level::ABSENT),
            None => Level::ABSENT,
        };
        let resource = descriptor
            .iter()
            .filter(|(k, _)| *k != LEVEL_ATTR)
            .map(|(k, v)| (k, v.clone()))
            .collect();
        Self { resource, level }
    }
}

impl From<Descriptor> for Grant {
    fn from(descriptor: Descriptor) -> Self {
        Grant::from_descriptor(descriptor)
    }
}

/// One grant or many, for the `assign_*` family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants(Vec<Grant>);

impl Grants {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn with_level(self, level: Level) -> Self {
        Grants(
            self.0
                .into_iter()
                .map(|grant| Grant { level, ..grant })
                .collect(),
        )
    }
}

impl From<Grant> for Grants {
    fn from(grant: Grant) -> Self {
        Grants(vec![grant])
    }
}

impl From<Vec<Grant>> for Grants {
    fn from(grants: Vec<Grant>) -> Self {
        Grants(grants)
    }
}

impl From<&[Grant]> for Grants {
    fn from(grants: &[Grant]) -> Self {
        Grants(grants.to_vec())
    }
}

impl From<Descriptor> for Grants {
    fn from(descriptor: Descriptor) -> Self {
        Grants(vec![Grant::from_descriptor(descriptor)])
    }
}

impl From<Vec<Descriptor>> for Grants {
    fn from(descriptors: Vec<Descriptor>) -> Self {
        Grants(descriptors.into_iter().map(Grant::from_descriptor).collect())
    }
}

impl FromIterator<Grant> for Grants {
    fn from_iter<I: IntoIterator<Item = Grant>>(iter: I) -> Self {
        Grants(iter.into_iter().collect())
    }
}

/// Permission queries with named levels.
pub struct Acl<S: Store> {
    perms: PermissionStore<S>,
    config: AclConfig,
    /// Orders calls when `Consistency::Serialized` is configured.
    order: RwLock<()>,
}

impl<S: Store> Acl<S> {
    /// Create an Acl over `store`.
    pub fn new(store: S, config: AclConfig) -> Self {
        Self {
            perms: PermissionStore::with_policy(store, config.descriptor_policy),
            config,
            order: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    /// Get the underlying permission store.
    pub fn permissions(&self) -> &PermissionStore<S> {
        &self.perms
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        self.perms.store()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assign
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign each grant's own level to `entity`. Negative levels revoke.
    ///
    /// All grants go to the store as one ordered batch.
    pub async fn assign_all(
        &self,
        entity: &Descriptor,
        grants: impl Into<Grants>,
    ) -> Result<BulkWriteResult> {
        self.assign_at(entity, grants.into(), now_millis()).await
    }

    /// Assign level 1 on every resource, whatever level the input carries.
    pub async fn assign_read(
        &self,
        entity: &Descriptor,
        grants: impl Into<Grants>,
    ) -> Result<BulkWriteResult> {
        self.assign_forced(entity, grants.into(), Level::READ).await
    }

    /// Assign level 2 on every resource, whatever level the input carries.
    pub async fn assign_write(
        &self,
        entity: &Descriptor,
        grants: impl Into<Grants>,
    ) -> Result<BulkWriteResult> {
        self.assign_forced(entity, grants.into(), Level::WRITE).await
    }

    /// Assign level 3 on every resource, whatever level the input carries.
    pub async fn assign_owner(
        &self,
        entity: &Descriptor,
        grants: impl Into<Grants>,
    ) -> Result<BulkWriteResult> {
        self.assign_forced(entity, grants.into(), Level::OWNER).await
    }

    /// Assign with an explicit timestamp.
    pub async fn assign_at(
        &self,
        entity: &Descriptor,
        grants: Grants,
        now: i64,
    ) -> Result<BulkWriteResult> {
        let pairs = grants
            .0
            .into_iter()
            .map(|grant| Assignment::new(entity.clone(), grant.resource, grant.level))
            .collect();

        let _guard = self.write_order().await;
        self.perms.upsert_many_at(pairs, now).await
    }

    async fn assign_forced(
        &self,
        entity: &Descriptor,
        grants: Grants,
        level: Level,
    ) -> Result<BulkWriteResult> {
        self.assign_at(entity, grants.with_level(level), now_millis())
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test
    // ─────────────────────────────────────────────────────────────────────────

    /// The level `entity` holds on `resource`, or `Level::ABSENT`.
    pub async fn test_all(&self, entity: &Descriptor, resource: &Descriptor) -> Result<Level> {
        let _guard = self.read_order().await;
        self.perms.find_one(entity, resource).await
    }

    pub async fn test_read(&self, entity: &Descriptor, resource: &Descriptor) -> Result<bool> {
        self.test_at_least(entity, resource, Level::READ).await
    }

    pub async fn test_write(&self, entity: &Descriptor, resource: &Descriptor) -> Result<bool> {
        self.test_at_least(entity, resource, Level::WRITE).await
    }

    pub async fn test_owner(&self, entity: &Descriptor, resource: &Descriptor) -> Result<bool> {
        self.test_at_least(entity, resource, Level::OWNER).await
    }

    async fn test_at_least(
        &self,
        entity: &Descriptor,
        resource: &Descriptor,
        min: Level,
    ) -> Result<bool> {
        Ok(self.test_all(entity, resource).await?.at_least(min))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Get
    // ─────────────────────────────────────────────────────────────────────────

    /// Every record of `entity` matching `resource`, at any level.
    pub async fn get_all(
        &self,
        entity: &Descriptor,
        resource: impl Into<ResourceFilter>,
    ) -> Result<Vec<PermissionRecord>> {
        self.get_at_least(entity, resource.into(), Level::NONE).await
    }

    pub async fn get_read(
        &self,
        entity: &Descriptor,
        resource: impl Into<ResourceFilter>,
    ) -> Result<Vec<PermissionRecord>> {
        self.get_at_least(entity, resource.into(), Level::READ).await
    }

    pub async fn get_write(
        &self,
        entity: &Descriptor,
        resource: impl Into<ResourceFilter>,
    ) -> Result<Vec<PermissionRecord>> {
        self.get_at_least(entity, resource.into(), Level::WRITE).await
    }

    pub async fn get_owner(
        &self,
        entity: &Descriptor,
        resource: impl Into<ResourceFilter>,
    ) -> Result<Vec<PermissionRecord>> {
        self.get_at_least(entity, resource.into(), Level::OWNER).await
    }

    async fn get_at_least(
        &self,
        entity: &Descriptor,
        resource: ResourceFilter,
        min: Level,
    ) -> Result<Vec<PermissionRecord>> {
        let _guard = self.read_order().await;
        self.perms
            .find(entity, &resource, &[Predicate::LevelAtLeast(min)])
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remove and serve
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove the record for (entity ∪ resource). Absent records are fine.
    pub async fn remove(&self, entity: &Descriptor, resource: &Descriptor) -> Result<bool> {
        let _guard = self.write_order().await;
        self.perms.remove(entity, resource).await
    }

    /// Gate asset text for `requester`.
    ///
    /// Anonymous requesters see level 0; superusers see the configured
    /// elevated level.
    pub fn serve_asset(&self, kind: AssetKind, source: &str, requester: &Requester) -> ServedAsset {
        let level = requester.resolve_level(self.config.elevated_level);
        ServedAsset::render(kind, source, level)
    }

    async fn write_order(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        match self.config.consistency {
            Consistency::Serialized => Some(self.order.write().await),
            Consistency::LastWriteWins => None,
        }
    }

    async fn read_order(&self) -> Option<RwLockReadGuard<'_, ()>> {
        match self.config.consistency {
            Consistency::Serialized => Some(self.order.read().await),
            Consistency::LastWriteWins => None,
        }
    }
}
