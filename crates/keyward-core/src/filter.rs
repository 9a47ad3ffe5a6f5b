//! Query building blocks.
//!
//! [`Predicate`] is what a backing store understands. [`ResourceFilter`] is
//! the three-way resource constraint accepted by listing queries, which
//! lowers to at most one predicate.

use crate::descriptor::{Descriptor, Identity};
use crate::types::{Level, Scalar};

/// A single constraint on a stored permission record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// The identity carries `key` with exactly `value`.
    Equals { key: String, value: Scalar },
    /// The identity carries `key`, whatever its value.
    Exists { key: String },
    /// `level >= n`.
    LevelAtLeast(Level),
    /// `level <= n`.
    LevelAtMost(Level),
}

impl Predicate {
    pub fn equals(key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Predicate::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Predicate::Exists { key: key.into() }
    }

    /// Exact match on the first declared attribute of a descriptor.
    ///
    /// Returns `None` for an empty descriptor.
    pub fn first_attr_of(descriptor: &Descriptor) -> Option<Self> {
        descriptor
            .first()
            .map(|(k, v)| Predicate::equals(k, v.clone()))
    }

    /// Evaluate the predicate against a record's identity and level.
    pub fn matches(&self, id: &Identity, level: Level) -> bool {
        match self {
            Predicate::Equals { key, value } => id.get(key) == Some(value),
            Predicate::Exists { key } => id.contains(key),
            Predicate::LevelAtLeast(min) => level >= *min,
            Predicate::LevelAtMost(max) => level <= *max,
        }
    }
}

/// Resource constraint for listing queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResourceFilter {
    /// No constraint beyond the entity match.
    #[default]
    NoFilter,
    /// Any record whose identity carries `key`.
    Exists { key: String },
    /// Records whose identity carries `key` with exactly `value`.
    Equals { key: String, value: Scalar },
}

impl ResourceFilter {
    /// Build a filter from the first attribute of a resource descriptor.
    ///
    /// A falsy value (`null`, `false`, `0`, `""`) turns into an existence
    /// check on the key. An empty descriptor means no filter.
    pub fn from_descriptor(resource: &Descriptor) -> Self {
        match resource.first() {
            None => ResourceFilter::NoFilter,
            Some((key, value)) if value.is_falsy() => ResourceFilter::Exists {
                key: key.to_string(),
            },
            Some((key, value)) => ResourceFilter::Equals {
                key: key.to_string(),
                value: value.clone(),
            },
        }
    }

    /// Lower to a store predicate.
    pub fn to_predicate(&self) -> Option<Predicate> {
        match self {
            ResourceFilter::NoFilter => None,
            ResourceFilter::Exists { key } => Some(Predicate::exists(key.clone())),
            ResourceFilter::Equals { key, value } => Some(Predicate::equals(key.clone(), value.clone())),
        }
    }
}

impl From<&str> for ResourceFilter {
    fn from(key: &str) -> Self {
        ResourceFilter::Exists {
            key: key.to_string(),
        }
    }
}

impl From<&Descriptor> for ResourceFilter {
    fn from(resource: &Descriptor) -> Self {
        ResourceFilter::from_descriptor(resource)
    }
}

impl From<Descriptor> for ResourceFilter {
    fn from(resource: Descriptor) -> Self {
        ResourceFilter::from_descriptor(&resource)
    }
}
