use std::collections::{BTreeMap, BTreeSet};

/// A one-to-many mapping. Keys with no values are never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    map: BTreeMap<K, BTreeSet<V>>,
    empty: BTreeSet<V>,
}

impl<K, V> MultiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    pub fn new() -> MultiMap<K, V> {
        MultiMap {
            map: BTreeMap::new(),
            empty: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map
            .entry(key)
            .or_insert_with(BTreeSet::new)
            .insert(value);
    }

    pub fn remove(&mut self, key: K, value: V) {
        let now_empty = match self.map.get_mut(&key) {
            Some(values) => {
                values.remove(&value);
                values.is_empty()
            }
            None => return,
        };
        if now_empty {
            self.map.remove(&key);
        }
    }

    pub fn remove_key(&mut self, key: &K) -> BTreeSet<V> {
        self.map.remove(key).unwrap_or_default()
    }

    pub fn get(&self, key: K) -> &BTreeSet<V> {
        self.map.get(&key).unwrap_or(&self.empty)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn borrow(&self) -> &BTreeMap<K, BTreeSet<V>> {
        &self.map
    }
}

impl<K, V> Default for MultiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn default() -> MultiMap<K, V> {
        MultiMap::new()
    }
}
