use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Number of raw bytes in an object id.
pub const OBJECT_ID_LENGTH: usize = 20;

/// Number of hex characters in a rendered object id.
pub const OBJECT_ID_STRING_LENGTH: usize = OBJECT_ID_LENGTH * 2;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 digest of an object's canonical
/// `"<type> <len>\0<payload>"` encoding. Identical content always produces
/// the same id, making objects deduplicatable and verifiable. Ordering is
/// big-endian byte comparison of the digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_raw(hash: [u8; OBJECT_ID_LENGTH]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a 20-byte slice.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; OBJECT_ID_LENGTH] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                expected: OBJECT_ID_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// The zero object id. Represents "no object" (absent tree entries,
    /// ref creation and deletion).
    pub const fn zero() -> Self {
        Self([0u8; OBJECT_ID_LENGTH])
    }

    /// Returns `true` if this is the zero object id.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LENGTH]
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LENGTH] {
        &self.0
    }

    /// First byte of the digest, used for fan-out bucketing.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Hex-encoded string representation (40 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex representation of `len` characters (clamped to 40).
    pub fn abbreviate(&self, len: usize) -> String {
        let mut s = self.to_hex();
        s.truncate(len.min(OBJECT_ID_STRING_LENGTH));
        s
    }

    /// Short hex representation (first 7 characters).
    pub fn short_hex(&self) -> String {
        self.abbreviate(7)
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != OBJECT_ID_STRING_LENGTH {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_STRING_LENGTH,
                actual: s.len(),
            });
        }
        let mut arr = [0u8; OBJECT_ID_LENGTH];
        hex::decode_to_slice(s, &mut arr).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Returns `true` if `s` is a 40-character hex string.
    pub fn is_id(s: &str) -> bool {
        s.len() == OBJECT_ID_STRING_LENGTH && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Returns `true` if the hex rendering of this id starts with `prefix`.
    ///
    /// `prefix` is compared case-insensitively.
    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        let hex = self.to_hex();
        prefix.len() <= hex.len()
            && hex.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LENGTH]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OBJECT_ID_LENGTH] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
