use arbor_types::{ObjectId, ObjectType, OBJECT_ID_LENGTH};
use sha1::{Digest, Sha1};

/// Incremental SHA-1 over an object's canonical encoding.
///
/// The id of an object is the digest of `"<type> <len>\0"` followed by the
/// payload. The header is fed on construction, so callers only stream the
/// payload bytes.
pub struct ObjectHasher {
    inner: Sha1,
}

impl ObjectHasher {
    /// Start hashing an object of `kind` with a payload of `len` bytes.
    pub fn new(kind: ObjectType, len: usize) -> Self {
        let mut inner = Sha1::new();
        inner.update(header(kind, len));
        Self { inner }
    }

    /// Feed payload bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finish and return the object id.
    pub fn finalize(self) -> ObjectId {
        let digest = self.inner.finalize();
        let mut raw = [0u8; OBJECT_ID_LENGTH];
        raw.copy_from_slice(&digest);
        ObjectId::from_raw(raw)
    }

    /// Hash a complete payload in one call.
    pub fn hash(kind: ObjectType, data: &[u8]) -> ObjectId {
        let mut hasher = Self::new(kind, data.len());
        hasher.update(data);
        hasher.finalize()
    }

    /// Verify that a payload produces the expected object id.
    pub fn verify(kind: ObjectType, data: &[u8], expected: &ObjectId) -> bool {
        Self::hash(kind, data) == *expected
    }
}

/// The canonical object header `"<type> <len>\0"`.
pub fn header(kind: ObjectType, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(kind.as_bytes());
    out.push(b' ');
    out.extend_from_slice(len.to_string().as_bytes());
    out.push(0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_has_well_known_id() {
        let id = ObjectHasher::hash(ObjectType::Blob, b"");
        assert_eq!(id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn empty_tree_has_well_known_id() {
        let id = ObjectHasher::hash(ObjectType::Tree, b"");
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn hello_blob() {
        let id = ObjectHasher::hash(ObjectType::Blob, b"hello\n");
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert!(ObjectHasher::verify(ObjectType::Blob, b"hello\n", &id));
        assert!(!ObjectHasher::verify(ObjectType::Blob, b"hello", &id));
    }

    #[test]
    fn type_is_part_of_the_id() {
        let blob = ObjectHasher::hash(ObjectType::Blob, b"same");
        let tree = ObjectHasher::hash(ObjectType::Tree, b"same");
        assert_ne!(blob, tree);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = ObjectHasher::new(ObjectType::Blob, 11);
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), ObjectHasher::hash(ObjectType::Blob, b"hello world"));
    }

    #[test]
    fn header_format() {
        assert_eq!(header(ObjectType::Commit, 123), b"commit 123\0".to_vec());
    }
}
