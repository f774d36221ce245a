use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_types::{ObjectId, ObjectIdMap};

use crate::error::{StoreError, StoreResult};
use crate::object::RawObject;
use crate::traits::ObjectStore;

/// In-memory object store.
///
/// Intended for tests and embedding. Objects are held in an [`ObjectIdMap`]
/// behind a `RwLock` and cloned on read.
pub struct InMemoryObjectStore {
    objects: RwLock<ObjectIdMap<RawObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(ObjectIdMap::new()),
        }
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, ObjectIdMap<RawObject>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Io(std::io::Error::other(format!("lock poisoned: {e}"))))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, ObjectIdMap<RawObject>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::Io(std::io::Error::other(format!("lock poisoned: {e}"))))
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All object ids in ascending order.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).keys().collect()
    }

    /// Store `object` under `id` without hashing.
    ///
    /// Lets tests plant objects whose content does not match their id.
    pub fn insert_unchecked(&self, id: ObjectId, object: RawObject) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, object);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<RawObject>> {
        Ok(self.read_lock()?.get(id).cloned())
    }

    fn write(&self, object: &RawObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        self.write_lock()?.get_or_insert_with(id, || object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.read_lock()?.contains_key(id))
    }

    fn resolve_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>> {
        Ok(self.read_lock()?.keys().filter(|id| id.starts_with_hex(prefix)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::ObjectType;

    fn blob(data: &[u8]) -> RawObject {
        RawObject::new(ObjectType::Blob, data.to_vec())
    }

    // -----------------------------------------------------------------------
    // Basic read/write
    // -----------------------------------------------------------------------

    #[test]
    fn write_then_read_returns_identical_bytes() {
        let store = InMemoryObjectStore::new();
        let obj = blob(b"hello world");
        let id = store.write(&obj).unwrap();
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn read_missing_returns_none() {
        let store = InMemoryObjectStore::new();
        assert!(store.read(&ObjectId::zero()).unwrap().is_none());
        assert!(!store.exists(&ObjectId::zero()).unwrap());
    }

    #[test]
    fn write_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let id1 = store.write(&blob(b"same")).unwrap();
        let id2 = store.write(&blob(b"same")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Prefix lookup and batches
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_prefix_finds_matches() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&blob(b"hello\n")).unwrap();
        store.write(&blob(b"other")).unwrap();
        assert_eq!(store.resolve_prefix("ce0136").unwrap(), vec![id]);
        assert_eq!(store.resolve_prefix("").unwrap().len(), 2);
        assert!(store.resolve_prefix("ffffff").unwrap().is_empty());
    }

    #[test]
    fn batch_operations() {
        let store = InMemoryObjectStore::new();
        let objs = vec![blob(b"a"), blob(b"b"), blob(b"c")];
        let ids = store.write_batch(&objs).unwrap();
        let read = store.read_batch(&ids).unwrap();
        assert_eq!(read.into_iter().flatten().collect::<Vec<_>>(), objs);
        assert_eq!(store.all_ids().len(), 3);
        assert!(!store.is_empty());
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let store = std::sync::Arc::new(InMemoryObjectStore::new());
        let id = store.write(&blob(b"kept")).unwrap();
        let held = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = held.objects.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.read(&id), Err(StoreError::Io(_))));
        assert!(matches!(store.write(&blob(b"new")), Err(StoreError::Io(_))));
        assert_eq!(store.len(), 1);
    }
}
