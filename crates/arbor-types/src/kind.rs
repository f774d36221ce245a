use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The four object kinds stored in an object database.
///
/// The numeric codes match the type codes used by the pack format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
}

impl ObjectType {
    /// Canonical name used in object headers (`"commit"`, `"tree"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    /// Canonical name as bytes.
    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Parse a canonical type name.
    pub fn parse(name: &[u8]) -> Result<Self, TypeError> {
        match name {
            b"commit" => Ok(Self::Commit),
            b"tree" => Ok(Self::Tree),
            b"blob" => Ok(Self::Blob),
            b"tag" => Ok(Self::Tag),
            other => Err(TypeError::UnknownObjectType(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Pack type code.
    pub fn type_code(&self) -> u8 {
        *self as u8
    }

    /// Parse a pack type code.
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for kind in [ObjectType::Commit, ObjectType::Tree, ObjectType::Blob, ObjectType::Tag] {
            assert_eq!(ObjectType::parse(kind.as_bytes()).unwrap(), kind);
            assert_eq!(ObjectType::from_type_code(kind.type_code()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            ObjectType::parse(b"receipt"),
            Err(TypeError::UnknownObjectType("receipt".into()))
        );
        assert!(ObjectType::from_type_code(7).is_none());
    }

    #[test]
    fn display_matches_header_name() {
        assert_eq!(ObjectType::Tag.to_string(), "tag");
        assert_eq!(serde_json::to_string(&ObjectType::Commit).unwrap(), "\"commit\"");
    }
}
