//! The index file: sorted entries, optional extensions, and a SHA-1 trailer.
//!
//! ```text
//! "DIRC" version(u32 = 2) count(u32)
//! entry * count
//! extension * n        (4-byte signature, u32 size, payload)
//! sha1 of everything above
//! ```
//!
//! Entries are ordered by path bytes, then by stage. Extensions whose
//! signature starts with an uppercase letter are optional caches and are
//! skipped on read; any other extension is rejected.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use arbor_store::{ObjectDatabase, Tree, TreeEntry};
use arbor_treewalk::TreeWalk;
use arbor_types::{FileMode, ObjectId};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::entry::{check_path, DirCacheEntry, Stage};
use crate::error::{IndexError, IndexResult};

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const TRAILER_LEN: usize = 20;

/// The staged state of a working tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirCache {
    entries: Vec<DirCacheEntry>,
}

impl DirCache {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DirCacheBuilder {
        DirCacheBuilder::new()
    }

    // ---------------------------------------------------------------
    // File format
    // ---------------------------------------------------------------

    /// Read an index file. A missing file is an empty index.
    pub fn read(path: &Path) -> IndexResult<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let cache = Self::parse(&data).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "rejected index file");
        })?;
        debug!(path = %path.display(), entries = cache.len(), "index read");
        Ok(cache)
    }

    /// Decode the bytes of an index file.
    pub fn parse(data: &[u8]) -> IndexResult<Self> {
        if data.len() < HEADER_LEN + TRAILER_LEN {
            return Err(IndexError::Corrupt("file too short".into()));
        }
        let (content, trailer) = data.split_at(data.len() - TRAILER_LEN);
        if Sha1::digest(content).as_slice() != trailer {
            return Err(IndexError::Corrupt("checksum mismatch".into()));
        }
        if &content[..4] != SIGNATURE {
            return Err(IndexError::Corrupt("bad signature".into()));
        }
        let version = be32(&content[4..8]);
        if version != VERSION {
            return Err(IndexError::UnsupportedVersion(version));
        }
        let count = be32(&content[8..12]) as usize;

        let mut pos = HEADER_LEN;
        let mut entries: Vec<DirCacheEntry> = Vec::with_capacity(count.min(content.len() / 64));
        for _ in 0..count {
            let (entry, used) = DirCacheEntry::decode(&content[pos..])?;
            if let Some(prev) = entries.last() {
                if sort_key(prev) >= sort_key(&entry) {
                    return Err(IndexError::Corrupt(format!(
                        "entry {:?} is out of order",
                        entry.path_string()
                    )));
                }
            }
            entries.push(entry);
            pos += used;
        }

        while pos < content.len() {
            let ext = &content[pos..];
            if ext.len() < 8 {
                return Err(IndexError::Corrupt("truncated extension header".into()));
            }
            let size = be32(&ext[4..8]) as usize;
            if !ext[0].is_ascii_uppercase() {
                return Err(IndexError::Corrupt(format!(
                    "unsupported required extension {:?}",
                    String::from_utf8_lossy(&ext[..4])
                )));
            }
            if ext.len() - 8 < size {
                return Err(IndexError::Corrupt("truncated extension".into()));
            }
            debug!(signature = %String::from_utf8_lossy(&ext[..4]), size, "skipping index extension");
            pos += 8 + size;
        }

        Ok(Self { entries })
    }

    /// Encode the index file, trailer included. Extensions are not written.
    pub fn encode(&self) -> Vec<u8> {
        let body: usize = self.entries.iter().map(DirCacheEntry::encoded_len).sum();
        let mut out = Vec::with_capacity(HEADER_LEN + body + TRAILER_LEN);
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            entry.encode_into(&mut out);
        }
        let digest = Sha1::digest(&out);
        out.extend_from_slice(&digest);
        out
    }

    /// Write the index atomically through `<path>.lock`.
    ///
    /// Fails with [`IndexError::Locked`] if another writer holds the lock.
    pub fn write(&self, path: &Path) -> IndexResult<()> {
        let lock = IndexLock::acquire(path)?;
        lock.commit(&self.encode())?;
        debug!(path = %path.display(), entries = self.len(), "index written");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in index order.
    pub fn entries(&self) -> &[DirCacheEntry] {
        &self.entries
    }

    /// Position of the first entry for `path`, or where it would be inserted.
    pub fn find(&self, path: &[u8]) -> Result<usize, usize> {
        let at = self.entries.partition_point(|e| e.path() < path);
        match self.entries.get(at) {
            Some(e) if e.path() == path => Ok(at),
            _ => Err(at),
        }
    }

    /// All stages present for `path`, lowest stage first.
    pub fn entries_for_path(&self, path: &[u8]) -> &[DirCacheEntry] {
        match self.find(path) {
            Ok(start) => {
                let len = self.entries[start..]
                    .iter()
                    .take_while(|e| e.path() == path)
                    .count();
                &self.entries[start..start + len]
            }
            Err(_) => &[],
        }
    }

    /// The merged (stage 0) entry for `path`.
    pub fn entry(&self, path: &[u8]) -> Option<&DirCacheEntry> {
        self.entries_for_path(path)
            .iter()
            .find(|e| e.stage() == Stage::Merged)
    }

    pub fn has_unmerged_paths(&self) -> bool {
        self.entries.iter().any(DirCacheEntry::is_unmerged)
    }

    /// Distinct paths with unresolved stages.
    pub fn unmerged_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.is_unmerged()) {
            let path = entry.path_string();
            if paths.last() != Some(&path) {
                paths.push(path);
            }
        }
        paths
    }

    // ---------------------------------------------------------------
    // Tree conversion
    // ---------------------------------------------------------------

    /// Build an index holding every file of `tree` at stage 0.
    pub fn read_tree(odb: &ObjectDatabase, tree: ObjectId) -> IndexResult<Self> {
        let mut walk = TreeWalk::new(odb);
        walk.add_tree(tree)?;
        walk.set_recursive(true);
        let mut builder = DirCacheBuilder::new();
        while walk.next()? {
            builder.add(DirCacheEntry::with_object(walk.path(), walk.file_mode(0), walk.object_id(0))?);
        }
        builder.finish()
    }

    /// Write the index content as trees and return the root tree id.
    ///
    /// Fails with [`IndexError::UnmergedPaths`] while conflicts remain.
    pub fn write_tree(&self, odb: &ObjectDatabase) -> IndexResult<ObjectId> {
        if self.has_unmerged_paths() {
            return Err(IndexError::UnmergedPaths(self.unmerged_paths()));
        }
        let id = write_level(odb, &self.entries, 0)?;
        debug!(tree = %id, entries = self.len(), "index written as tree");
        Ok(id)
    }
}

fn write_level(odb: &ObjectDatabase, entries: &[DirCacheEntry], prefix: usize) -> IndexResult<ObjectId> {
    let mut tree_entries = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let rest = &entries[i].path()[prefix..];
        match rest.iter().position(|&b| b == b'/') {
            None => {
                let entry = &entries[i];
                if entry.mode.object_type().is_none() {
                    return Err(IndexError::Corrupt(format!(
                        "entry {:?} has invalid mode {}",
                        entry.path_string(),
                        entry.mode
                    )));
                }
                tree_entries.push(TreeEntry::new(entry.mode, rest, entry.id));
                i += 1;
            }
            Some(slash) => {
                // Paths under one directory are contiguous in index order.
                let dir = &rest[..=slash];
                let end = i + entries[i..]
                    .iter()
                    .take_while(|e| e.path()[prefix..].starts_with(dir))
                    .count();
                let id = write_level(odb, &entries[i..end], prefix + slash + 1)?;
                tree_entries.push(TreeEntry::new(FileMode::TREE, &rest[..slash], id));
                i = end;
            }
        }
    }
    let tree = Tree::from_entries(tree_entries).map_err(|e| IndexError::InvalidPath(e.to_string()))?;
    Ok(odb.insert_tree(&tree)?)
}

fn sort_key(entry: &DirCacheEntry) -> (&[u8], Stage) {
    (entry.path(), entry.stage())
}

fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

// ---------------------------------------------------------------
// Builder
// ---------------------------------------------------------------

/// Collects entries in any order and produces a sorted [`DirCache`].
#[derive(Debug, Default)]
pub struct DirCacheBuilder {
    entries: Vec<DirCacheEntry>,
}

impl DirCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: DirCacheEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Copy every entry of an existing index.
    pub fn keep_all(&mut self, cache: &DirCache) -> &mut Self {
        self.entries.extend(cache.entries().iter().cloned());
        self
    }

    /// Sort the entries; two entries with the same path and stage are an error.
    pub fn finish(mut self) -> IndexResult<DirCache> {
        self.entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        if let Some(pair) = self.entries.windows(2).find(|w| sort_key(&w[0]) == sort_key(&w[1])) {
            return Err(IndexError::DuplicateEntry {
                path: pair[0].path_string(),
                stage: pair[0].stage().number(),
            });
        }
        for entry in &self.entries {
            check_path(entry.path())?;
        }
        Ok(DirCache {
            entries: self.entries,
        })
    }
}

// ---------------------------------------------------------------
// Locking
// ---------------------------------------------------------------

/// Exclusive `<index>.lock`, removed on drop unless committed.
struct IndexLock {
    file: Option<File>,
    target: PathBuf,
    lock_path: PathBuf,
}

impl IndexLock {
    fn acquire(target: &Path) -> IndexResult<Self> {
        let mut lock_name = target.as_os_str().to_owned();
        lock_name.push(".lock");
        let lock_path = PathBuf::from(lock_name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(path = %lock_path.display(), "index is locked by another writer");
                return Err(IndexError::Locked(lock_path));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            file: Some(file),
            target: target.to_path_buf(),
            lock_path,
        })
    }

    fn commit(mut self, data: &[u8]) -> IndexResult<()> {
        if let Some(mut file) = self.file.take() {
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&self.lock_path, &self.target)?;
        Ok(())
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        // Still present only if commit failed or never ran.
        if self.lock_path.exists() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
