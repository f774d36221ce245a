use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::kind::ObjectType;

const TYPE_MASK: u32 = 0o170000;

/// Raw file mode of a tree or index entry.
///
/// Modes are kept as their raw 32-bit value rather than an enum: historic
/// trees contain non-canonical modes (e.g. `100664`), and the tree walker
/// compares raw modes when deciding whether an entry differs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    /// Subtree / directory (040000).
    pub const TREE: Self = Self(0o040000);
    /// Normal file (100644).
    pub const REGULAR_FILE: Self = Self(0o100644);
    /// Executable file (100755).
    pub const EXECUTABLE_FILE: Self = Self(0o100755);
    /// Symbolic link (120000).
    pub const SYMLINK: Self = Self(0o120000);
    /// Submodule commit reference (160000).
    pub const GITLINK: Self = Self(0o160000);
    /// No entry present in this tree.
    pub const MISSING: Self = Self(0);

    /// Wrap a raw mode value.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw mode value.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if this mode names a subtree.
    pub fn is_tree(&self) -> bool {
        self.0 & TYPE_MASK == Self::TREE.0
    }

    /// Returns `true` for the absent-entry mode.
    pub fn is_missing(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this mode names a submodule commit.
    pub fn is_gitlink(&self) -> bool {
        self.0 & TYPE_MASK == Self::GITLINK.0
    }

    /// Object type an entry with this mode points at.
    pub fn object_type(&self) -> Option<ObjectType> {
        match self.0 & TYPE_MASK {
            0o040000 => Some(ObjectType::Tree),
            0o100000 | 0o120000 => Some(ObjectType::Blob),
            0o160000 => Some(ObjectType::Commit),
            _ => None,
        }
    }

    /// Parse an octal mode string as found in tree records.
    pub fn parse_octal(text: &[u8]) -> Result<Self, TypeError> {
        if text.is_empty() || text.len() > 7 {
            return Err(TypeError::InvalidMode(String::from_utf8_lossy(text).into_owned()));
        }
        let mut bits = 0u32;
        for &c in text {
            if !(b'0'..=b'7').contains(&c) {
                return Err(TypeError::InvalidMode(String::from_utf8_lossy(text).into_owned()));
            }
            bits = (bits << 3) | u32::from(c - b'0');
        }
        Ok(Self(bits))
    }

    /// Octal text as written into tree records (no leading zero padding).
    pub fn to_octal(&self) -> String {
        format!("{:o}", self.0)
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({:06o})", self.0)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}
