//! Canonical tree encoding.
//!
//! A tree is a sequence of `<octal mode> <name>\0<20 raw id bytes>` records.
//! Records are sorted by name with subtrees compared as if their name ended
//! in `/`, so `"a.txt"` sorts before the directory `"a"` (`'.' < '/'`) while
//! the file `"a"` sorts before both. The id of a tree is a hash over exactly
//! this order, so parsers reject out-of-order or duplicate entries.

use std::cmp::Ordering;

use arbor_types::{FileMode, ObjectId, ObjectType, OBJECT_ID_LENGTH};

use crate::error::ParseError;
use crate::object::RawObject;

/// Compare two entry names in tree order.
///
/// `a_tree`/`b_tree` say whether the name belongs to a subtree, in which
/// case it compares as if followed by `/`.
pub fn git_name_cmp(a: &[u8], a_tree: bool, b: &[u8], b_tree: bool) -> Ordering {
    let n = a.len().min(b.len());
    match a[..n].cmp(&b[..n]) {
        Ordering::Equal => {}
        other => return other,
    }
    let next = |name: &[u8], is_tree: bool| -> u8 {
        match name.get(n) {
            Some(&c) => c,
            None if is_tree => b'/',
            None => 0,
        }
    };
    next(a, a_tree).cmp(&next(b, b_tree))
}

/// One record of a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: Vec<u8>,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<Vec<u8>>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    /// Returns `true` if this entry names a subtree.
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    /// The name, lossily decoded as UTF-8.
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    fn cmp_order(&self, other: &TreeEntry) -> Ordering {
        git_name_cmp(&self.name, self.is_tree(), &other.name, other.is_tree())
    }
}

/// A parsed tree: entries in canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from entries in any order.
    ///
    /// Entries are sorted into canonical order. Two entries with the same
    /// name are rejected.
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Result<Self, ParseError> {
        entries.sort_by(|a, b| a.cmp_order(b));
        for entry in &entries {
            check_name(&entry.name)?;
        }
        // A file and a directory of the same name can land apart after
        // sorting ("a", "a.b", "a/"), so compare plain names.
        let mut names: Vec<&[u8]> = entries.iter().map(|e| e.name.as_slice()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ParseError::new("duplicate tree entry name"));
        }
        Ok(Self { entries })
    }

    /// Decode a tree payload.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut entries: Vec<TreeEntry> = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let space = data[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ParseError::new("tree entry has no mode terminator"))?;
            let mode = FileMode::parse_octal(&data[pos..pos + space])?;
            pos += space + 1;

            let nul = data[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ParseError::new("tree entry name is not terminated"))?;
            let name = data[pos..pos + nul].to_vec();
            check_name(&name)?;
            pos += nul + 1;

            let raw = data
                .get(pos..pos + OBJECT_ID_LENGTH)
                .ok_or_else(|| ParseError::new("tree entry id is truncated"))?;
            let id = ObjectId::from_raw_bytes(raw)?;
            pos += OBJECT_ID_LENGTH;

            let entry = TreeEntry { mode, name, id };
            if let Some(prev) = entries.last() {
                if prev.name == entry.name {
                    return Err(ParseError::new(format!(
                        "duplicate tree entry {:?}",
                        entry.name_str()
                    )));
                }
                if prev.cmp_order(&entry) != Ordering::Less {
                    return Err(ParseError::new(format!(
                        "tree entries out of order at {:?}",
                        entry.name_str()
                    )));
                }
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Encode into the canonical payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 40);
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.to_octal().as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    /// Convert into a `RawObject` for storage.
    pub fn to_raw(&self) -> RawObject {
        RawObject::new(ObjectType::Tree, self.encode())
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Look up an entry by name.
    pub fn find(&self, name: &[u8]) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_name(name: &[u8]) -> Result<(), ParseError> {
    if name.is_empty() {
        return Err(ParseError::new("tree entry has an empty name"));
    }
    if name.contains(&b'/') {
        return Err(ParseError::new("tree entry name contains '/'"));
    }
    if name == b"." || name == b".." {
        return Err(ParseError::new("tree entry name is '.' or '..'"));
    }
    Ok(())
}
