//! Map keyed by [`ObjectId`], partitioned on the first digest byte.
//!
//! Object ids are uniformly distributed SHA-1 digests, so splitting on the
//! leading byte spreads keys evenly over 256 buckets. Each bucket is an
//! ordered map keyed by the remaining 19 bytes: comparisons touch one byte
//! less, and each bucket stays 256x smaller than a single flat tree would be.
//! Iteration visits buckets in order, which yields a total order identical
//! to sorting by `ObjectId`.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::object::{ObjectId, OBJECT_ID_LENGTH};

const BUCKETS: usize = 256;
const TAIL_LENGTH: usize = OBJECT_ID_LENGTH - 1;

type Tail = [u8; TAIL_LENGTH];

fn split(id: &ObjectId) -> (usize, Tail) {
    let bytes = id.as_bytes();
    let mut tail = [0u8; TAIL_LENGTH];
    tail.copy_from_slice(&bytes[1..]);
    (bytes[0] as usize, tail)
}

fn join(bucket: usize, tail: &Tail) -> ObjectId {
    let mut raw = [0u8; OBJECT_ID_LENGTH];
    raw[0] = bucket as u8;
    raw[1..].copy_from_slice(tail);
    ObjectId::from_raw(raw)
}

/// An associative container keyed by [`ObjectId`].
///
/// Lookups return the most recently inserted value for a key, and iteration
/// over an unmodified map always produces the same ascending order.
#[derive(Clone)]
pub struct ObjectIdMap<V> {
    buckets: Box<[BTreeMap<Tail, V>]>,
    len: usize,
}

impl<V> ObjectIdMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        let buckets: Vec<BTreeMap<Tail, V>> = (0..BUCKETS).map(|_| BTreeMap::new()).collect();
        Self {
            buckets: buckets.into_boxed_slice(),
            len: 0,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, returning the previous value for the key if any.
    pub fn insert(&mut self, id: ObjectId, value: V) -> Option<V> {
        let (bucket, tail) = split(&id);
        let old = self.buckets[bucket].insert(tail, value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Look up the value stored for `id`.
    pub fn get(&self, id: &ObjectId) -> Option<&V> {
        let (bucket, tail) = split(id);
        self.buckets[bucket].get(&tail)
    }

    /// Look up a mutable reference to the value stored for `id`.
    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut V> {
        let (bucket, tail) = split(id);
        self.buckets[bucket].get_mut(&tail)
    }

    /// Returns `true` if the map holds a value for `id`.
    pub fn contains_key(&self, id: &ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Return the value for `id`, inserting the result of `make` first if
    /// the key is absent.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, id: ObjectId, make: F) -> &mut V {
        let (bucket, tail) = split(&id);
        match self.buckets[bucket].entry(tail) {
            btree_map::Entry::Occupied(e) => e.into_mut(),
            btree_map::Entry::Vacant(e) => {
                self.len += 1;
                e.insert(make())
            }
        }
    }

    /// Remove the entry for `id`, returning its value.
    pub fn remove(&mut self, id: &ObjectId) -> Option<V> {
        let (bucket, tail) = split(id);
        let old = self.buckets[bucket].remove(&tail);
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Iterate entries in ascending id order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: &self.buckets,
            bucket: 0,
            inner: None,
            remaining: self.len,
        }
    }

    /// Iterate keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Iterate values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<V> Default for ObjectIdMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for ObjectIdMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> FromIterator<(ObjectId, V)> for ObjectIdMap<V> {
    fn from_iter<I: IntoIterator<Item = (ObjectId, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<V> Extend<(ObjectId, V)> for ObjectIdMap<V> {
    fn extend<I: IntoIterator<Item = (ObjectId, V)>>(&mut self, iter: I) {
        for (id, value) in iter {
            self.insert(id, value);
        }
    }
}

impl<'a, V> IntoIterator for &'a ObjectIdMap<V> {
    type Item = (ObjectId, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over an [`ObjectIdMap`].
pub struct Iter<'a, V> {
    buckets: &'a [BTreeMap<Tail, V>],
    bucket: usize,
    inner: Option<btree_map::Iter<'a, Tail, V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (ObjectId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(inner) = self.inner.as_mut() {
                if let Some((tail, value)) = inner.next() {
                    self.remaining -= 1;
                    return Some((join(self.bucket - 1, tail), value));
                }
            }
            if self.bucket >= self.buckets.len() {
                return None;
            }
            self.inner = Some(self.buckets[self.bucket].iter());
            self.bucket += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
