//! # Keyward Store
//!
//! Backing-store boundary for keyward. Provides a trait-based interface for
//! permission record persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The permission layer only needs four primitives from a store, captured by
//! the [`Store`] trait:
//!
//! - single-record lookup by exact attribute match ([`Store::find_one`])
//! - multi-predicate filtered search with sort ([`Store::find`])
//! - ordered bulk write of mixed upserts and deletes ([`Store::bulk_write`])
//! - single-record delete ([`Store::delete_one`])
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests and embedding
//! - [`WriteOp`] / [`BulkWriteResult`] - Bulk write input and outcome
//! - [`Query`] / [`Sort`] - Filtered search
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keyward_core::{Identity, Level, Predicate};
//! use keyward_store::{SqliteStore, Store, WriteOp};
//!
//! async fn example() {
//!     let store = SqliteStore::open("acl.db").unwrap();
//!
//!     let id: Identity = [("account", "a1"), ("doc", "d1")].into_iter().collect();
//!     store
//!         .bulk_write(vec![WriteOp::upsert(id, Level::READ, 1_700_000_000_000)])
//!         .await
//!         .unwrap();
//!
//!     let found = store
//!         .find_one(&[Predicate::equals("account", "a1")])
//!         .await
//!         .unwrap();
//!     assert!(found.is_some());
//! }
//! ```
//!
//! ## Concurrency
//!
//! Stores hold no permission state outside the backend itself. Two upserts
//! on the same identity race at the backend and the later one wins: its
//! level and `modified_at` are kept, `created_at` stays from the first
//! insert. Items inside one bulk write are applied in the order supplied.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use migration::now_millis;
pub use sqlite::SqliteStore;
pub use traits::{matches_all, BulkWriteResult, Query, Sort, Store, StoreExt, WriteOp};
