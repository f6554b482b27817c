use crate::types::Value;
use derive_more::{Deref, DerefMut, From};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// An unordered mapping from [`Value`] to [`Value`] with unique keys.
///
/// Enumeration order is whatever the backing map yields: stable within one
/// process run for an unmutated table, promised to nobody beyond that.
#[derive(Clone, Default, Debug)]
pub struct Table {
    entries: HashMap<Value, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(Value, Value)> for Table {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self {
            entries: HashMap::from_iter(iter),
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
impl Eq for Table {}

impl Hash for Table {
    /// Order-independent: the per-entry hashes are combined commutatively,
    /// so two equal tables hash alike no matter their enumeration orders.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined = 0u64;
        for (k, v) in self.entries.iter() {
            let mut entry_hasher = std::collections::hash_map::DefaultHasher::new();
            (k, v).hash(&mut entry_hasher);
            combined = combined.wrapping_add(entry_hasher.finish());
        }
        state.write_usize(self.entries.len());
        state.write_u64(combined);
    }
}

/// A mapping from [`Value`] to [`Value`] that additionally preserves
/// insertion order. Equality and hashing are order-sensitive; the order is
/// part of the meaning.
#[derive(Clone, Default, Debug)]
pub struct OrderedTable {
    entries: IndexMap<Value, Value>,
}

impl OrderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(Value, Value)> for OrderedTable {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self {
            entries: IndexMap::from_iter(iter),
        }
    }
}

impl PartialEq for OrderedTable {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}
impl Eq for OrderedTable {}

impl Hash for OrderedTable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for entry in self.iter() {
            entry.hash(state);
        }
    }
}

/// A fixed-shape ordered sequence of [`Value`]s. Wire-wise it is close to a
/// heterogeneous array but carries its own tag.
#[derive(Clone, Default, PartialEq, Eq, Hash, From, Deref, DerefMut, Debug)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(members: Vec<Value>) -> Self {
        Self(members)
    }

    pub fn into_members(self) -> Vec<Value> {
        self.0
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(Vec::from_iter(iter))
    }
}
