//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use keyward_core::{Identity, IdentityKey, PermissionRecord, Predicate};

use crate::error::{Result, StoreError};
use crate::traits::{matches_all, BulkWriteResult, Query, Store, WriteOp};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    /// Records indexed by identity key.
    records: RwLock<BTreeMap<IdentityKey, PermissionRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every stored record, in identity-key order.
    pub fn snapshot(&self) -> Result<Vec<PermissionRecord>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<IdentityKey, PermissionRecord>>> {
        self.records
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<IdentityKey, PermissionRecord>>> {
        self.records
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one write op to the map, updating the running result.
fn apply_op(
    records: &mut BTreeMap<IdentityKey, PermissionRecord>,
    op: WriteOp,
    result: &mut BulkWriteResult,
) -> Result<()> {
    let key = op.identity().key()?;
    match op {
        WriteOp::Upsert { level, .. } if !level.is_storable() => {
            return Err(StoreError::InvalidData(format!(
                "refusing to store negative level {}",
                level
            )));
        }
        WriteOp::Upsert { id, level, now } => match records.get_mut(&key) {
            Some(existing) => {
                existing.update(level, now);
                result.updated += 1;
            }
            None => {
                records.insert(key, PermissionRecord::inserted(id, level, now));
                result.inserted += 1;
            }
        },
        WriteOp::Delete { .. } => {
            if records.remove(&key).is_some() {
                result.deleted += 1;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_one(&self, predicates: &[Predicate]) -> Result<Option<PermissionRecord>> {
        let records = self.read()?;
        Ok(records
            .values()
            .find(|record| matches_all(predicates, record))
            .cloned())
    }

    async fn find(&self, query: &Query) -> Result<Vec<PermissionRecord>> {
        let mut found: Vec<PermissionRecord> = {
            let records = self.read()?;
            records
                .values()
                .filter(|record| query.matches(record))
                .cloned()
                .collect()
        };
        query.sort.apply(&mut found);
        Ok(found)
    }

    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteResult> {
        let mut records = self.write()?;
        let mut result = BulkWriteResult::default();

        for (index, op) in ops.into_iter().enumerate() {
            if let Err(e) = apply_op(&mut records, op, &mut result) {
                tracing::warn!("bulk write stopped at op {}: {}", index, e);
                return Err(StoreError::BulkWrite {
                    index,
                    committed: index,
                    message: e.to_string(),
                });
            }
        }

        tracing::debug!(
            inserted = result.inserted,
            updated = result.updated,
            deleted = result.deleted,
            "bulk write applied"
        );
        Ok(result)
    }

    async fn delete_one(&self, id: &Identity) -> Result<bool> {
        let key = id.key()?;
        let mut records = self.write()?;
        Ok(records.remove(&key).is_some())
    }
}
