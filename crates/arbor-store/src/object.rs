use arbor_types::{ObjectId, ObjectType};

use crate::error::ParseError;
use crate::hasher::{header, ObjectHasher};

/// An object as stored: type tag plus canonical payload bytes.
///
/// `RawObject` is the unit of storage. Stores never interpret the payload;
/// the typed codecs ([`Commit`](crate::Commit), [`Tree`](crate::Tree),
/// [`Tag`](crate::Tag), [`Blob`]) do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawObject {
    /// The type of this object.
    pub kind: ObjectType,
    /// The payload, without the `"<type> <len>\0"` header.
    pub data: Vec<u8>,
}

impl RawObject {
    /// Create a raw object from kind and payload.
    pub fn new(kind: ObjectType, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Compute the content-addressed id of this object.
    pub fn compute_id(&self) -> ObjectId {
        ObjectHasher::hash(self.kind, &self.data)
    }

    /// Header followed by payload, the exact bytes the id is computed over.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = header(self.kind, self.data.len());
        out.extend_from_slice(&self.data);
        out
    }

    /// Split canonical bytes back into type and payload, checking the length.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let nul = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ParseError::new("object header is not terminated"))?;
        let head = &bytes[..nul];
        let space = head
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| ParseError::new("object header has no length"))?;
        let kind = ObjectType::parse(&head[..space])?;
        let len = parse_decimal(&head[space + 1..])
            .ok_or_else(|| ParseError::new("object header length is not a number"))?;
        let data = &bytes[nul + 1..];
        if data.len() != len {
            return Err(ParseError::new(format!(
                "object header declares {len} bytes, found {}",
                data.len()
            )));
        }
        Ok(Self::new(kind, data.to_vec()))
    }
}

fn parse_decimal(text: &[u8]) -> Option<usize> {
    if text.is_empty() || (text.len() > 1 && text[0] == b'0') {
        return None;
    }
    std::str::from_utf8(text).ok()?.parse().ok()
}

/// File content. The payload is opaque.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a blob from raw bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Convert into a `RawObject` for storage.
    pub fn to_raw(&self) -> RawObject {
        RawObject::new(ObjectType::Blob, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_bytes_roundtrip() {
        let obj = RawObject::new(ObjectType::Blob, b"hello\n".to_vec());
        let bytes = obj.to_canonical_bytes();
        assert_eq!(&bytes[..7], b"blob 6\0");
        assert_eq!(RawObject::from_canonical_bytes(&bytes).unwrap(), obj);
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(RawObject::from_canonical_bytes(b"blob 5\0hello!").is_err());
        assert!(RawObject::from_canonical_bytes(b"blob 05\0hello").is_err());
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(RawObject::from_canonical_bytes(b"blob 5hello").is_err());
        assert!(RawObject::from_canonical_bytes(b"blob\0").is_err());
        assert!(RawObject::from_canonical_bytes(b"note 0\0").is_err());
    }

    #[test]
    fn blob_id_matches_hasher() {
        let blob = Blob::new("hello\n");
        assert_eq!(
            blob.to_raw().compute_id().to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }
}
