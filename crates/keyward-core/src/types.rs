//! Strong type definitions for keyward.
//!
//! Identifiers and levels are newtypes so that a raw `i64` or byte array is
//! never mistaken for one at a call site.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// A scalar attribute value inside a descriptor.
///
/// Variants are totally ordered (variant first, then value) so identities can
/// be sorted deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Scalar {
    /// Whether this value counts as "empty" in a resource filter.
    ///
    /// `Null`, `false`, `0` and `""` are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Bool(b) => !b,
            Scalar::Int(i) => *i == 0,
            Scalar::Text(s) => s.is_empty(),
        }
    }

    /// Short numeric tag for the variant, used by storage backends.
    pub const fn kind(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Bool(_) => 1,
            Scalar::Int(_) => 2,
            Scalar::Text(_) => 3,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A permission level.
///
/// Levels are cumulative: a holder of `WRITE` also holds `READ`. Negative
/// values never reach storage; they mean "no record" on reads and "delete"
/// on writes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Level(pub i64);

impl Level {
    /// Returned by lookups when no record matches.
    pub const ABSENT: Self = Self(-1);
    /// Baseline: the record exists but grants nothing beyond membership.
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(2);
    pub const OWNER: Self = Self(3);
    /// Default level handed to superuser requesters.
    pub const ELEVATED: Self = Self(5);

    /// Create a level from a raw value.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Whether a record with this level may exist in storage.
    pub const fn is_storable(&self) -> bool {
        self.0 >= 0
    }

    /// Whether this level grants at least `other`.
    pub const fn at_least(&self, other: Level) -> bool {
        self.0 >= other.0
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({})", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A 32-byte identity key, computed as Blake3(canonical bytes of an identity).
///
/// Two identities with the same attribute set always produce the same key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey(pub [u8; 32]);

impl IdentityKey {
    /// Create a key from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for IdentityKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for IdentityKey {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength(slice.len()))?;
        Ok(Self(arr))
    }
}
