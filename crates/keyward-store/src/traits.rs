//! Store trait: the abstract interface for permission record persistence.
//!
//! This trait allows the permission layer to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use keyward_core::{Identity, Level, PermissionRecord, Predicate};

use crate::error::Result;

/// One item of a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or update the record with this identity.
    ///
    /// Sets `level` and `modified_at = now`; sets `created_at = now` only
    /// when the record did not exist.
    Upsert { id: Identity, level: Level, now: i64 },
    /// Delete the record with this identity, if any.
    Delete { id: Identity },
}

impl WriteOp {
    pub fn upsert(id: Identity, level: Level, now: i64) -> Self {
        WriteOp::Upsert { id, level, now }
    }

    pub fn delete(id: Identity) -> Self {
        WriteOp::Delete { id }
    }

    /// The identity this op targets.
    pub fn identity(&self) -> &Identity {
        match self {
            WriteOp::Upsert { id, .. } | WriteOp::Delete { id } => id,
        }
    }
}

/// Outcome of a successful bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    /// Upserts that created a record.
    pub inserted: usize,
    /// Upserts that updated an existing record.
    pub updated: usize,
    /// Deletes that removed a record.
    pub deleted: usize,
}

impl BulkWriteResult {
    /// Number of records touched.
    pub fn touched(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: BulkWriteResult) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

/// Result ordering for [`Store::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sort {
    /// Backend order.
    #[default]
    Unordered,
    /// Ascending by the resource portion of the identity: every attribute
    /// not named in `entity_keys`, compared as an ordered attribute list.
    /// Ties fall back to the full identity.
    ResourceAscending { entity_keys: BTreeSet<String> },
}

impl Sort {
    /// Order two records under this sort.
    pub fn compare(&self, a: &PermissionRecord, b: &PermissionRecord) -> Ordering {
        match self {
            Sort::Unordered => Ordering::Equal,
            Sort::ResourceAscending { entity_keys } => a
                .id
                .portion_excluding(entity_keys)
                .cmp(&b.id.portion_excluding(entity_keys))
                .then_with(|| a.id.cmp(&b.id)),
        }
    }

    /// Sort records in place.
    pub fn apply(&self, records: &mut [PermissionRecord]) {
        if !matches!(self, Sort::Unordered) {
            records.sort_by(|a, b| self.compare(a, b));
        }
    }
}

/// A filtered search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// All predicates must hold. An empty list matches every record.
    pub predicates: Vec<Predicate>,
    pub sort: Sort,
}

impl Query {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            sort: Sort::Unordered,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Whether a record satisfies every predicate.
    pub fn matches(&self, record: &PermissionRecord) -> bool {
        matches_all(&self.predicates, record)
    }
}

/// Whether a record satisfies every predicate in `predicates`.
pub fn matches_all(predicates: &[Predicate], record: &PermissionRecord) -> bool {
    predicates.iter().all(|p| p.matches(&record.id, record.level))
}

/// The Store trait: async interface for permission record persistence.
///
/// All methods are async to support both sync (SQLite) and remote backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Absence is not an error**: lookups return `None` or an empty `Vec`.
/// - **Ordered bulk writes**: ops apply in order. A failure at op `i` leaves
///   ops `0..i` committed and surfaces as one `StoreError::BulkWrite`.
/// - **Last write wins**: concurrent upserts on one identity are resolved by
///   the backend; the later write's level and `modified_at` are kept.
#[async_trait]
pub trait Store: Send + Sync {
    /// Find one record matching every predicate.
    ///
    /// When several match, which one is returned is backend-defined.
    async fn find_one(&self, predicates: &[Predicate]) -> Result<Option<PermissionRecord>>;

    /// Find all records matching the query, in the query's sort order.
    async fn find(&self, query: &Query) -> Result<Vec<PermissionRecord>>;

    /// Apply an ordered batch of upserts and deletes.
    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteResult>;

    /// Delete the record with exactly this identity.
    ///
    /// Returns whether a record was removed.
    async fn delete_one(&self, id: &Identity) -> Result<bool>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn find_one(&self, predicates: &[Predicate]) -> Result<Option<PermissionRecord>> {
        (**self).find_one(predicates).await
    }

    async fn find(&self, query: &Query) -> Result<Vec<PermissionRecord>> {
        (**self).find(query).await
    }

    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteResult> {
        (**self).bulk_write(ops).await
    }

    async fn delete_one(&self, id: &Identity) -> Result<bool> {
        (**self).delete_one(id).await
    }
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Level of the first record matching `predicates`, or `Level::ABSENT`.
    fn find_level(
        &self,
        predicates: &[Predicate],
    ) -> impl std::future::Future<Output = Result<Level>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn find_level(&self, predicates: &[Predicate]) -> Result<Level> {
        Ok(self
            .find_one(predicates)
            .await?
            .map(|record| record.level)
            .unwrap_or(Level::ABSENT))
    }
}
