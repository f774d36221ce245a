use arbor_types::ObjectId;

use crate::error::StoreResult;
use crate::object::RawObject;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same type and payload always
///   produce the same id, so a second write of identical content is a no-op.
/// - A write is complete before its id is returned; readers never observe a
///   partially written object.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by id.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<RawObject>>;

    /// Write an object and return its content-addressed id.
    fn write(&self, object: &RawObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// All ids whose hex form starts with `prefix`, sorted.
    ///
    /// `prefix` is lowercase hex of any length up to 40.
    fn resolve_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>>;

    /// Read multiple objects in a batch.
    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<RawObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }

    /// Write multiple objects in a batch and return their ids.
    fn write_batch(&self, objects: &[RawObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }
}
