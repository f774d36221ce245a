//! Loose object storage in git's `objects/` layout.
//!
//! Each object lives at `objects/<first 2 hex>/<remaining 38 hex>` as the
//! zlib-deflated canonical encoding `"<type> <len>\0<payload>"`.
//!
//! Writes deflate into a temporary file inside the fan-out directory and
//! rename it into place without clobbering. A concurrent writer of the same
//! object either wins the rename or finds the finished file, so readers never
//! see a partial object and repeated writes are idempotent.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use arbor_types::{ObjectId, OBJECT_ID_STRING_LENGTH};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::error::{StoreError, StoreResult};
use crate::hasher::header;
use crate::object::RawObject;
use crate::traits::ObjectStore;

/// Default zlib level, matching git's `core.looseCompression` default.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 1;

/// Object store reading and writing loose object files.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
    compression: Compression,
    verify_on_read: bool,
}

impl LooseObjectStore {
    /// Open the loose store rooted at `objects_dir` (usually `.git/objects`).
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            compression: Compression::new(DEFAULT_COMPRESSION_LEVEL),
            verify_on_read: true,
        }
    }

    /// Set the zlib level (0-9) used for new objects.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    /// Re-hash objects on read and reject mismatches as corrupt.
    pub fn with_verify_on_read(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }

    /// The directory objects are stored under.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    fn decode(&self, id: &ObjectId, file: File) -> StoreResult<RawObject> {
        let mut inflated = Vec::new();
        ZlibDecoder::new(BufReader::new(file))
            .read_to_end(&mut inflated)
            .map_err(|e| StoreError::CorruptObject {
                id: *id,
                reason: format!("inflate failed: {e}"),
            })?;
        let object = RawObject::from_canonical_bytes(&inflated).map_err(|e| e.into_corrupt(*id))?;
        if self.verify_on_read {
            let actual = object.compute_id();
            if actual != *id {
                warn!(%id, %actual, "loose object content does not match its name");
                return Err(StoreError::CorruptObject {
                    id: *id,
                    reason: format!("content hashes to {actual}"),
                });
            }
        }
        Ok(object)
    }
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<RawObject>> {
        let file = match File::open(self.object_path(id)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!(%id, "reading loose object");
        self.decode(id, file).map(Some)
    }

    fn write(&self, object: &RawObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            trace!(%id, "object already present");
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Io(ErrorKind::NotFound.into()))?;
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        let mut encoder = ZlibEncoder::new(tmp, self.compression);
        encoder.write_all(&header(object.kind, object.data.len()))?;
        encoder.write_all(&object.data)?;
        let tmp = encoder.finish()?;
        tmp.as_file().sync_all()?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.error.into()),
        }
        debug!(%id, kind = %object.kind, size = object.data.len(), "wrote loose object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn resolve_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }
        if prefix.len() < 2 {
            // Shorter than a fan-out directory name: scan every directory.
            let mut out = Vec::new();
            for dir in 0..=255u8 {
                let name = format!("{dir:02x}");
                if name.starts_with(&prefix) {
                    out.extend(self.scan_fanout(&name, "")?);
                }
            }
            return Ok(out);
        }
        self.scan_fanout(&prefix[..2], &prefix[2..])
    }
}

impl LooseObjectStore {
    fn scan_fanout(&self, dir: &str, rest: &str) -> StoreResult<Vec<ObjectId>> {
        let entries = match fs::read_dir(self.objects_dir.join(dir)) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.len() + 2 != OBJECT_ID_STRING_LENGTH || !name.starts_with(rest) {
                continue;
            }
            if let Ok(id) = ObjectId::from_hex(&format!("{dir}{name}")) {
                out.push(id);
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::ObjectType;

    fn temp_store() -> (tempfile::TempDir, LooseObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    fn blob(data: &[u8]) -> RawObject {
        RawObject::new(ObjectType::Blob, data.to_vec())
    }

    fn deflate(bytes: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn write_uses_fanout_layout() {
        let (dir, store) = temp_store();
        let id = store.write(&blob(b"hello\n")).unwrap();
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        let path = dir
            .path()
            .join("objects/ce/013625030ba8dba906f756967f9e9ca394464a");
        assert!(path.is_file());
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn roundtrip_is_byte_identical() {
        let (_dir, store) = temp_store();
        let obj = RawObject::new(ObjectType::Commit, b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n".to_vec());
        let id = store.write(&obj).unwrap();
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn repeated_write_is_idempotent() {
        let (_dir, store) = temp_store();
        let a = store.write(&blob(b"twice")).unwrap();
        let b = store.write(&blob(b"twice")).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.resolve_prefix(&a.to_hex()[..4]).unwrap(), vec![a]);
    }

    #[test]
    fn missing_object_reads_none() {
        let (_dir, store) = temp_store();
        assert!(store.read(&ObjectId::zero()).unwrap().is_none());
    }

    #[test]
    fn reads_objects_written_by_other_tools() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_hex("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, deflate(b"blob 6\0hello\n")).unwrap();
        assert_eq!(store.read(&id).unwrap(), Some(blob(b"hello\n")));
    }

    #[test]
    fn hash_mismatch_is_corrupt() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_raw([0x11; 20]);
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, deflate(b"blob 3\0abc")).unwrap();

        assert!(store.read(&id).unwrap_err().is_corrupt());

        let lenient = store.clone().with_verify_on_read(false);
        assert_eq!(lenient.read(&id).unwrap(), Some(blob(b"abc")));
    }

    #[test]
    fn garbage_is_corrupt() {
        let (_dir, store) = temp_store();
        let id = ObjectId::from_raw([0x22; 20]);
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"definitely not zlib").unwrap();
        assert!(store.read(&id).unwrap_err().is_corrupt());
    }

    #[test]
    fn short_prefix_scans_all_fanouts() {
        let (_dir, store) = temp_store();
        let id = store.write(&blob(b"hello\n")).unwrap();
        assert_eq!(store.resolve_prefix("c").unwrap(), vec![id]);
        assert!(store.resolve_prefix("d").unwrap().is_empty());
    }
}
