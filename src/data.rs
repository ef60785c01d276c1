use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::types::{CanonicalKey, FieldName};

/// A single scalar attribute value.
///
/// Sources only ever produce `Str`; `Int` appears once a field has been
/// canonicalized and `Null` fills missing optional fields after a join.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Str(String),
}

impl FieldValue {
    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Interpret this value as a canonical key.
    ///
    /// Strings are trimmed and parsed as base-10 integers; anything that does
    /// not parse yields `None` instead of an error.
    pub fn as_key(&self) -> Option<CanonicalKey> {
        match self {
            FieldValue::Int(value) => Some(*value),
            FieldValue::Str(raw) => raw.trim().parse::<CanonicalKey>().ok(),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// Flat record: attribute name to scalar value, in source attribute order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<FieldName, FieldValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs, keeping their order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<FieldName>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Insert or replace a field. Replacing keeps the existing position.
    pub fn insert(&mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Canonical key stored under `name`, without modifying the record.
    pub fn key(&self, name: &str) -> Option<CanonicalKey> {
        self.fields.get(name).and_then(FieldValue::as_key)
    }

    /// Canonicalize `name` in place and return the key.
    ///
    /// A parseable string is replaced by its integer form so later lookups
    /// reuse the canonical value. Absent or unparseable fields are left as-is.
    pub fn canonicalize(&mut self, name: &str) -> Option<CanonicalKey> {
        let slot = self.fields.get_mut(name)?;
        let key = slot.as_key()?;
        *slot = FieldValue::Int(key);
        Some(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.fields.iter()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }
}

impl<K: Into<FieldName>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// Set of canonical keys produced by one pass and read by later ones.
///
/// Ordered so that logs and diagnostics list keys deterministically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeSet<CanonicalKey>,
}

impl KeySet {
    /// Create an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `false` when it was already present.
    pub fn insert(&mut self, key: CanonicalKey) -> bool {
        self.keys.insert(key)
    }

    /// Membership test.
    pub fn contains(&self, key: CanonicalKey) -> bool {
        self.keys.contains(&key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no key is present.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CanonicalKey> + '_ {
        self.keys.iter().copied()
    }

    /// New set holding every key of `self` and `other`.
    pub fn union(&self, other: &KeySet) -> KeySet {
        KeySet {
            keys: self.keys.union(&other.keys).copied().collect(),
        }
    }
}

impl FromIterator<CanonicalKey> for KeySet {
    fn from_iter<T: IntoIterator<Item = CanonicalKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
