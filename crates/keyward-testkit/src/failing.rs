//! A store wrapper that fails bulk writes part-way.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use keyward_core::{Identity, PermissionRecord, Predicate};
use keyward_store::{BulkWriteResult, Query, Result, Store, StoreError, WriteOp};

/// Wraps a store and fails every bulk write longer than `commit_limit` ops.
///
/// The first `commit_limit` ops of such a batch are handed to the inner
/// store and stay committed; the call then returns `StoreError::BulkWrite`
/// pointing at the first op that was not applied. Shorter batches pass
/// through untouched. Every batch size is recorded.
pub struct FailingStore<S: Store> {
    inner: S,
    commit_limit: usize,
    bulk_calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl<S: Store> FailingStore<S> {
    pub fn new(inner: S, commit_limit: usize) -> Self {
        Self {
            inner,
            commit_limit,
            bulk_calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of `bulk_write` calls seen.
    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Size of every batch seen, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<S: Store> Store for FailingStore<S> {
    async fn find_one(&self, predicates: &[Predicate]) -> Result<Option<PermissionRecord>> {
        self.inner.find_one(predicates).await
    }

    async fn find(&self, query: &Query) -> Result<Vec<PermissionRecord>> {
        self.inner.find(query).await
    }

    async fn bulk_write(&self, mut ops: Vec<WriteOp>) -> Result<BulkWriteResult> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sizes) = self.batch_sizes.lock() {
            sizes.push(ops.len());
        }

        if ops.len() <= self.commit_limit {
            return self.inner.bulk_write(ops).await;
        }

        ops.truncate(self.commit_limit);
        self.inner.bulk_write(ops).await?;
        Err(StoreError::BulkWrite {
            index: self.commit_limit,
            committed: self.commit_limit,
            message: "injected failure".into(),
        })
    }

    async fn delete_one(&self, id: &Identity) -> Result<bool> {
        self.inner.delete_one(id).await
    }
}
