//! # Keyward Core
//!
//! Pure primitives for keyward: descriptors, identities, permission levels,
//! query predicates, and the content gate.
//!
//! This crate contains no I/O and no storage. Everything here is plain
//! computation over owned values, safe to share across request handlers.
//!
//! ## Key Types
//!
//! - [`Descriptor`] - Ordered key/value attributes naming an entity or a resource
//! - [`Identity`] - The composite key of a permission record
//! - [`IdentityKey`] - Content-addressed digest of an identity (Blake3)
//! - [`Level`] - Cumulative capability rank (none, read, write, owner)
//! - [`PermissionRecord`] - The only persisted entity
//! - [`ResourceFilter`] / [`Predicate`] - Query building blocks
//!
//! ## Content Gate
//!
//! [`gate`] strips or keeps `/*ACL>n*/ ... /*ENDACL*/` blocks of served text
//! depending on the requester's level. See the [`gate`](mod@gate) module.

pub mod descriptor;
pub mod error;
pub mod filter;
pub mod gate;
pub mod record;
pub mod requester;
pub mod types;

pub use descriptor::{Descriptor, Identity, LEVEL_ATTR};
pub use error::{CoreError, Result};
pub use filter::{Predicate, ResourceFilter};
pub use gate::{gate, scan, GateOp, Segment};
pub use record::PermissionRecord;
pub use requester::Requester;
pub use types::{IdentityKey, Level, Scalar};
