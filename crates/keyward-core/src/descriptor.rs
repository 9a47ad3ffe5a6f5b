//! Descriptors and composite identities.
//!
//! A [`Descriptor`] is an ordered list of attributes naming either the subject
//! of a permission (an account, a group) or the protected resource. There is
//! no fixed schema: any attribute names may be used.
//!
//! An [`Identity`] is the union of an entity descriptor and a resource
//! descriptor. It is kept in a sorted map so that equal attribute sets always
//! produce the same canonical bytes and therefore the same [`IdentityKey`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{IdentityKey, Scalar};

/// Attribute name that never takes part in an identity.
pub const LEVEL_ATTR: &str = "level";

/// Ordered key/value attributes.
///
/// Declaration order is preserved because lookups index on the first
/// declared attribute only (see [`Descriptor::first`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    attrs: Vec<(String, Scalar)>,
}

impl Descriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a descriptor with a single attribute.
    pub fn single(key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new().with(key, value)
    }

    /// Add an attribute, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an attribute.
    ///
    /// Re-inserting an existing key replaces its value in place and keeps
    /// its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Look up an attribute by name.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The first declared attribute, if any.
    pub fn first(&self) -> Option<(&str, &Scalar)> {
        self.attrs.first().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attribute names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Descriptor
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut descriptor = Descriptor::new();
        for (k, v) in iter {
            descriptor.insert(k, v);
        }
        descriptor
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Descriptor
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// The composite key of a permission record.
///
/// Built from the union of an entity and a resource descriptor, minus the
/// `level` attribute. Keys are ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(BTreeMap<String, Scalar>);

impl Identity {
    /// Merge an entity and a resource descriptor into an identity.
    ///
    /// On a key collision the resource value wins. The `level` attribute is
    /// dropped from both sides.
    pub fn merge(entity: &Descriptor, resource: &Descriptor) -> Self {
        let attrs = entity
            .iter()
            .chain(resource.iter())
            .filter(|(k, _)| *k != LEVEL_ATTR)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Self(attrs)
    }

    /// Look up an attribute by name.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    /// Whether the identity carries an attribute, whatever its value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attributes whose names are not in `exclude`, in key order.
    ///
    /// Passing the entity's attribute names yields the resource portion.
    pub fn portion_excluding(&self, exclude: &BTreeSet<String>) -> Vec<(&str, &Scalar)> {
        self.iter().filter(|(k, _)| !exclude.contains(*k)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deterministic CBOR encoding of the identity.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(&self.0, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode an identity previously produced by [`Identity::canonical_bytes`].
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        let attrs: BTreeMap<String, Scalar> =
            ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        Ok(Self(attrs))
    }

    /// Compute the content-addressed key of this identity.
    pub fn key(&self) -> Result<IdentityKey> {
        let bytes = self.canonical_bytes()?;
        Ok(IdentityKey(*blake3::hash(&bytes).as_bytes()))
    }
}

impl<K, V> FromIterator<(K, V)> for Identity
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account(id: &str) -> Descriptor {
        Descriptor::single("account", id)
    }

    #[test]
    fn test_descriptor_keeps_declaration_order() {
        let d = Descriptor::new().with("zeta", 1i64).with("alpha", 2i64);
        assert_eq!(d.first(), Some(("zeta", &Scalar::Int(1))));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_descriptor_reinsert_replaces_in_place() {
        let mut d = Descriptor::from([("a", 1i64), ("b", 2i64)]);
        d.insert("a", 9i64);
        assert_eq!(d.len(), 2);
        assert_eq!(d.first(), Some(("a", &Scalar::Int(9))));
    }

    #[test]
    fn test_merge_is_union() {
        let resource = Descriptor::new().with("doc", "d1").with("section", 4i64);
        let id = Identity::merge(&account("a1"), &resource);

        assert_eq!(id.len(), 3);
        assert_eq!(id.get("account"), Some(&Scalar::from("a1")));
        assert_eq!(id.get("doc"), Some(&Scalar::from("d1")));
        assert_eq!(id.get("section"), Some(&Scalar::Int(4)));
    }

    #[test]
    fn test_merge_drops_level() {
        let resource = Descriptor::new().with("doc", "d1").with(LEVEL_ATTR, 2i64);
        let id = Identity::merge(&account("a1"), &resource);
        assert!(!id.contains(LEVEL_ATTR));
        assert_eq!(id.len(), 2);
    }

    #[test]
    fn test_merge_resource_wins_on_collision() {
        let entity = Descriptor::new().with("account", "a1").with("scope", "entity");
        let resource = Descriptor::new().with("scope", "resource");
        let id = Identity::merge(&entity, &resource);
        assert_eq!(id.get("scope"), Some(&Scalar::from("resource")));
    }

    #[test]
    fn test_key_ignores_declaration_order() {
        let r1 = Descriptor::new().with("doc", "d1").with("tab", "t1");
        let r2 = Descriptor::new().with("tab", "t1").with("doc", "d1");
        let k1 = Identity::merge(&account("a1"), &r1).key().unwrap();
        let k2 = Identity::merge(&account("a1"), &r2).key().unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_key_depends_on_shape() {
        let by_doc = Identity::merge(&account("a1"), &Descriptor::single("doc", "x"));
        let by_group = Identity::merge(&account("a1"), &Descriptor::single("group", "x"));
        assert_ne!(by_doc.key().unwrap(), by_group.key().unwrap());
    }

    #[test]
    fn test_portion_excluding() {
        let id = Identity::merge(
            &account("a1"),
            &Descriptor::new().with("doc", "d1").with("tab", "t1"),
        );
        let entity_keys = BTreeSet::from(["account".to_string()]);
        let portion = id.portion_excluding(&entity_keys);
        assert_eq!(
            portion,
            vec![("doc", &Scalar::from("d1")), ("tab", &Scalar::from("t1"))]
        );
    }

    #[test]
    fn test_canonical_roundtrip() {
        let id = Identity::merge(
            &account("a1"),
            &Descriptor::new().with("doc", "d1").with("public", true),
        );
        let bytes = id.canonical_bytes().unwrap();
        let decoded = Identity::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn test_identity_serializes_as_flat_object() {
        let id = Identity::merge(&account("a1"), &Descriptor::single("doc", 7i64));
        let json = serde_json::to_value(&id).unwrap();
        assert!(json.get("account").is_some());
        assert!(json.get("doc").is_some());
    }

    proptest! {
        #[test]
        fn test_key_is_deterministic(
            attrs in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..6),
        ) {
            let forward: Descriptor = attrs.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let backward: Descriptor = attrs.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
            let entity = Descriptor::single("account", "p");

            let k1 = Identity::merge(&entity, &forward).key().unwrap();
            let k2 = Identity::merge(&entity, &backward).key().unwrap();
            prop_assert_eq!(k1, k2);
        }
    }
}
