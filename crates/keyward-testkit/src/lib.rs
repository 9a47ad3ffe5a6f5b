//! # Keyward Testkit
//!
//! Testing utilities for keyward.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An [`AclFixture`] over a memory or SQLite store, plus
//!   descriptor helpers
//! - **Generators**: Proptest strategies for descriptors, levels and gated
//!   source text
//! - **Fault injection**: [`FailingStore`], which commits the first N ops of
//!   a bulk write and then fails
//!
//! ## Property Testing
//!
//! [`GatedSource`] is built from known parts, so the expected gate output can
//! be computed without running the gate:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keyward_core::gate;
//! use keyward_testkit::generators::{requester_level, GatedSource};
//!
//! proptest! {
//!     #[test]
//!     fn gate_matches_model(source: GatedSource, level in requester_level()) {
//!         prop_assert_eq!(gate(&source.render(), level), source.expected(level));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use keyward_testkit::fixtures::{account, AclFixture};
//!
//! let fixture = AclFixture::new();
//! let docs = fixture.seed_docs(&account("a1"), &[0, 1, 2, 3]).await?;
//! ```

pub mod failing;
pub mod fixtures;
pub mod generators;

pub use failing::FailingStore;
pub use fixtures::{account, accounts, doc, AclFixture};
pub use generators::{GatePart, GatedSource, GrantParams};
