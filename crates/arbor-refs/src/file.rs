//! On-disk reference store using git's layout.
//!
//! Loose refs live as files under the git directory (`HEAD`,
//! `refs/heads/main`, ...). A file holds either `<40 hex>\n` or
//! `ref: <target>\n`. Refs not present as loose files are looked up in
//! `packed-refs`.
//!
//! Every mutation first creates `<ref>.lock` with create-new semantics. If
//! the lock already exists another writer is active and the operation fails
//! with [`RefError::LockFailure`]. The new content is written and synced into
//! the lock file, which is then renamed over the ref. Dropping an uncommitted
//! lock removes it.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use arbor_types::ObjectId;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{Ref, RefUpdate, UpdateOutcome, R_REFS};

const PACKED_REFS: &str = "packed-refs";
const SYMREF_PREFIX: &str = "ref: ";
const LOCK_SUFFIX: &str = ".lock";

/// An exclusive lock on one file, held as `<file>.lock`.
struct LockFile {
    name: String,
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
}

impl LockFile {
    fn acquire(name: &str, target: PathBuf) -> Result<Self> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut lock_name = target.as_os_str().to_owned();
        lock_name.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(name, "ref is locked by another writer");
                return Err(RefError::LockFailure {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            name: name.to_string(),
            target,
            lock_path,
            file: Some(file),
        })
    }

    fn commit(mut self, content: &[u8]) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.write_all(content)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&self.lock_path, &self.target) {
            let _ = fs::remove_file(&self.lock_path);
            return Err(e.into());
        }
        debug!(name = %self.name, "lock committed");
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if self.file.is_some() {
            self.file = None;
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

/// A [`RefStore`] backed by a git directory.
#[derive(Debug, Clone)]
pub struct FileRefStore {
    git_dir: PathBuf,
}

impl FileRefStore {
    /// Open the ref store rooted at `git_dir`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    /// The git directory this store reads.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.git_dir.join(name)
    }

    fn read_loose(&self, name: &str) -> Result<Option<Ref>> {
        let path = self.ref_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            // A directory at this path (e.g. "refs/heads" itself) is not a ref.
            Err(_) if path.is_dir() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_loose(name, content.trim_end()).map(Some)
    }

    fn read_packed(&self) -> Result<Vec<Ref>> {
        let content = match fs::read_to_string(self.git_dir.join(PACKED_REFS)) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut refs = Vec::new();
        for line in content.lines() {
            // Header comments and peeled-tag lines carry no ref of their own.
            if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
                continue;
            }
            let (hex, name) = line.split_once(' ').ok_or_else(|| RefError::Corrupt {
                name: PACKED_REFS.to_string(),
                reason: format!("malformed line: {line:?}"),
            })?;
            let target = ObjectId::from_hex(hex).map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            refs.push(Ref::direct(name, target));
        }
        Ok(refs)
    }

    fn read_current(&self, name: &str) -> Result<Option<Ref>> {
        if let Some(r) = self.read_loose(name)? {
            return Ok(Some(r));
        }
        Ok(self.read_packed()?.into_iter().find(|r| r.name() == name))
    }

    fn remove_from_packed(&self, name: &str) -> Result<()> {
        let packed = self.read_packed()?;
        if !packed.iter().any(|r| r.name() == name) {
            return Ok(());
        }
        let lock = LockFile::acquire(PACKED_REFS, self.git_dir.join(PACKED_REFS))?;
        let mut out = String::from("# pack-refs with: peeled\n");
        for r in packed.iter().filter(|r| r.name() != name) {
            if let Some(id) = r.object_id() {
                out.push_str(&format!("{id} {}\n", r.name()));
            }
        }
        lock.commit(out.as_bytes())
    }

    fn prune_empty_dirs(&self, name: &str) {
        let refs_root = self.git_dir.join(R_REFS.trim_end_matches('/'));
        let mut dir = self.ref_path(name).parent().map(Path::to_path_buf);
        while let Some(d) = dir {
            // Keep the top-level namespaces such as refs/heads.
            if d.parent() == Some(refs_root.as_path())
                || !d.starts_with(&refs_root)
                || fs::remove_dir(&d).is_err()
            {
                break;
            }
            dir = d.parent().map(Path::to_path_buf);
        }
    }
}

fn parse_loose(name: &str, content: &str) -> Result<Ref> {
    if let Some(target) = content.strip_prefix(SYMREF_PREFIX) {
        return Ok(Ref::symbolic(name, target.trim()));
    }
    let target = ObjectId::from_hex(content).map_err(|e| RefError::Corrupt {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Ref::direct(name, target))
}

impl RefStore for FileRefStore {
    fn read(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        self.read_current(name)
    }

    fn list(&self, prefix: &str) -> Result<Vec<Ref>> {
        let mut found = std::collections::BTreeMap::new();
        for r in self.read_packed()? {
            found.insert(r.name().to_string(), r);
        }

        let refs_root = self.git_dir.join(R_REFS.trim_end_matches('/'));
        if refs_root.is_dir() {
            for entry in WalkDir::new(&refs_root).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    RefError::Io(e.into_io_error().unwrap_or_else(|| ErrorKind::Other.into()))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&self.git_dir) else {
                    continue;
                };
                let name = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if name.ends_with(LOCK_SUFFIX) || validate_ref_name(&name).is_err() {
                    continue;
                }
                if let Some(r) = self.read_loose(&name)? {
                    found.insert(name, r);
                }
            }
        }

        Ok(found
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, r)| r)
            .collect())
    }

    fn update(&self, update: &RefUpdate) -> Result<UpdateOutcome> {
        validate_ref_name(&update.name)?;
        let leaf = self.leaf_name(&update.name)?;
        validate_ref_name(&leaf)?;

        let lock = LockFile::acquire(&leaf, self.ref_path(&leaf))?;
        let current = self.read_current(&leaf)?.and_then(|r| r.object_id());
        if !update.accepts(current) {
            return Err(RefError::Rejected {
                name: leaf,
                expected: update.expected_old.unwrap_or_else(ObjectId::zero),
                actual: current.unwrap_or_else(ObjectId::zero),
            });
        }
        lock.commit(format!("{}\n", update.new_id).as_bytes())?;
        debug!(name = %leaf, new = %update.new_id, "ref updated");
        Ok(UpdateOutcome::from_transition(current, update.new_id))
    }

    fn delete(&self, name: &str, expected_old: Option<ObjectId>) -> Result<bool> {
        validate_ref_name(name)?;
        let lock = LockFile::acquire(name, self.ref_path(name))?;
        let Some(existing) = self.read_current(name)? else {
            return Ok(false);
        };
        if let Some(expected) = expected_old {
            let actual = existing.object_id().unwrap_or_else(ObjectId::zero);
            if actual != expected {
                return Err(RefError::Rejected {
                    name: name.to_string(),
                    expected,
                    actual,
                });
            }
        }
        match fs::remove_file(self.ref_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.remove_from_packed(name)?;
        drop(lock);
        self.prune_empty_dirs(name);
        debug!(name, "ref deleted");
        Ok(true)
    }

    fn link(&self, name: &str, target: &str) -> Result<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let lock = LockFile::acquire(name, self.ref_path(name))?;
        lock.commit(format!("{SYMREF_PREFIX}{target}\n").as_bytes())?;
        debug!(name, target, "symbolic ref written");
        Ok(())
    }
}
