//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use keyward::{Acl, AclConfig, Grant};
use keyward_core::{Descriptor, Level};
use keyward_store::{MemoryStore, SqliteStore, Store};

/// An entity descriptor for an account.
pub fn account(id: &str) -> Descriptor {
    Descriptor::single("account", id)
}

/// A resource descriptor for a document.
pub fn doc(id: &str) -> Descriptor {
    Descriptor::single("doc", id)
}

/// A test fixture holding an [`Acl`] over some store.
pub struct AclFixture<S: Store = MemoryStore> {
    pub acl: Acl<S>,
}

impl AclFixture<MemoryStore> {
    /// Fixture over a fresh in-memory store with default config.
    pub fn new() -> Self {
        Self::with_config(AclConfig::default())
    }

    pub fn with_config(config: AclConfig) -> Self {
        Self::over(MemoryStore::new(), config)
    }
}

impl AclFixture<SqliteStore> {
    /// Fixture over an in-memory SQLite database.
    pub fn sqlite() -> keyward_store::Result<Self> {
        Ok(Self::over(SqliteStore::open_memory()?, AclConfig::default()))
    }
}

impl<S: Store> AclFixture<S> {
    /// Fixture over an existing store.
    pub fn over(store: S, config: AclConfig) -> Self {
        Self {
            acl: Acl::new(store, config),
        }
    }

    /// Assign `levels[i]` on `doc-i` to `entity` in one batch.
    ///
    /// Returns the resource descriptors in assignment order.
    pub async fn seed_docs(
        &self,
        entity: &Descriptor,
        levels: &[i64],
    ) -> keyward::Result<Vec<Descriptor>> {
        let resources: Vec<Descriptor> = (0..levels.len())
            .map(|i| doc(&format!("doc-{}", i)))
            .collect();
        let grants: Vec<Grant> = resources
            .iter()
            .zip(levels)
            .map(|(resource, level)| Grant::new(resource.clone(), Level(*level)))
            .collect();
        self.acl.assign_all(entity, grants).await?;
        Ok(resources)
    }
}

impl Default for AclFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity descriptors for several distinct accounts.
pub fn accounts(count: usize) -> Vec<Descriptor> {
    (0..count).map(|i| account(&format!("account-{}", i))).collect()
}
