//! # Keyward
//!
//! Hierarchical permissions for a document-style web application, plus a
//! request-time content gate for the scripts and stylesheets it serves.
//!
//! ## Overview
//!
//! - **Permission store**: records granting an entity (an account, a group)
//!   a level on a resource, keyed by the union of both descriptors
//! - **Acl**: the named-level facade (`assign_*`, `test_*`, `get_*`, `remove`)
//! - **Content gate**: strips or keeps `/*ACL>n*/ ... /*ENDACL*/` blocks of
//!   served text by requester level
//!
//! Levels are cumulative: 0 none, 1 read, 2 write, 3 owner. A missing record
//! reads as level -1 and is never an error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keyward::{Acl, AclConfig, Descriptor, Grant, Level};
//! use keyward::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("acl.db").unwrap();
//!     let acl = Acl::new(store, AclConfig::default());
//!
//!     let account = Descriptor::single("account", "a1");
//!     let doc = Descriptor::single("doc", "d1");
//!
//!     acl.assign_write(&account, Grant::new(doc.clone(), Level::NONE))
//!         .await
//!         .unwrap();
//!
//!     assert!(acl.test_read(&account, &doc).await.unwrap());
//!     assert!(!acl.test_owner(&account, &doc).await.unwrap());
//! }
//! ```
//!
//! ## Consistency
//!
//! By default concurrent assignments to one identity race at the store and
//! the later write wins. `AclConfig::serialized()` orders calls made through
//! one `Acl` so reads observe earlier writes.
//!
//! ## Re-exports
//!
//! - `keyward::core` - Descriptors, identities, levels, the gate
//! - `keyward::store` - Storage abstraction, SQLite and in-memory backends

pub mod acl;
pub mod asset;
pub mod config;
pub mod error;
pub mod permission_store;

// Re-export component crates
pub use keyward_core as core;
pub use keyward_store as store;

// Re-export main types for convenience
pub use acl::{Acl, Grant, Grants};
pub use asset::{AssetKind, ServedAsset};
pub use config::{AclConfig, Consistency, DescriptorPolicy};
pub use error::{AclError, Result};
pub use permission_store::{Assignment, PermissionStore};

// Re-export commonly used core types
pub use keyward_core::{
    gate, Descriptor, Identity, Level, PermissionRecord, Predicate, Requester, ResourceFilter,
    Scalar,
};
