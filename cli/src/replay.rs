use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ForestError;

/// Write-once mapping from an action key to awarded points.
///
/// Presence is tracked explicitly: a key committed with zero points is
/// consumed just like any other. Entries are never overwritten or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMap<K: Ord> {
    entries: BTreeMap<K, u128>,
}

impl<K: Ord> Default for RecordMap<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> RecordMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<u128> {
        self.entries.get(key).copied()
    }

    /// Stored points, or 0 when the key was never written.
    pub fn points(&self, key: &K) -> u128 {
        self.get(key).unwrap_or(0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn check_unused(&self, key: &K) -> Result<(), ForestError> {
        if self.contains(key) {
            return Err(ForestError::DuplicateData);
        }
        Ok(())
    }

    /// Record `points` under `key`. The write is the consumption marker: a
    /// second consume of the same key fails with `DuplicateData`.
    pub fn consume(&mut self, key: K, points: u128) -> Result<(), ForestError> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(ForestError::DuplicateData),
            Entry::Vacant(slot) => {
                slot.insert(points);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, u128> {
        self.entries.iter()
    }

    pub fn total_points(&self) -> u128 {
        self.entries
            .values()
            .fold(0u128, |acc, points| acc.saturating_add(*points))
    }
}

impl<K: Ord + Serialize> Serialize for RecordMap<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

struct RecordMapVisitor<K>(PhantomData<K>);

impl<'de, K: Ord + Deserialize<'de>> Visitor<'de> for RecordMapVisitor<K> {
    type Value = RecordMap<K>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of [key, points] entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut map = RecordMap::new();
        while let Some((key, points)) = seq.next_element::<(K, u128)>()? {
            if let Entry::Vacant(slot) = map.entries.entry(key) {
                slot.insert(points);
            } else {
                return Err(de::Error::custom("duplicate record key"));
            }
        }
        Ok(map)
    }
}

impl<'de, K: Ord + Deserialize<'de>> Deserialize<'de> for RecordMap<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(RecordMapVisitor(PhantomData))
    }
}
