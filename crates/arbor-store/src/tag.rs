//! Canonical annotated-tag encoding.
//!
//! ```text
//! object <hex>\n
//! type <commit|tree|blob|tag>\n
//! tag <name>\n
//! tagger <ident>\n        (optional for very old tags)
//! \n
//! <message>
//! ```

use arbor_types::{ObjectId, ObjectType};

use crate::commit::{parse_id, short_message, split_headers, write_header};
use crate::error::ParseError;
use crate::ident::PersonIdent;
use crate::object::RawObject;

/// A parsed annotated tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub object: ObjectId,
    pub target_type: ObjectType,
    pub tag_name: String,
    pub tagger: Option<PersonIdent>,
    /// Headers after `tagger`, kept so the encoding round-trips.
    pub extra_headers: Vec<(String, Vec<u8>)>,
    pub message: Vec<u8>,
}

impl Tag {
    /// Decode a tag payload.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let (headers, message) = split_headers(data)?;
        let mut headers = headers.into_iter().peekable();

        let object = match headers.next() {
            Some((b"object", value)) => parse_id(&value, "object")?,
            _ => return Err(ParseError::new("tag does not start with an object header")),
        };
        let target_type = match headers.next() {
            Some((b"type", value)) => ObjectType::parse(&value)?,
            _ => return Err(ParseError::new("tag has no type header")),
        };
        let tag_name = match headers.next() {
            Some((b"tag", value)) => String::from_utf8_lossy(&value).into_owned(),
            _ => return Err(ParseError::new("tag has no tag header")),
        };
        let tagger = match headers.peek() {
            Some((b"tagger", _)) => match headers.next() {
                Some((_, value)) => Some(PersonIdent::parse(&value)?),
                None => None,
            },
            _ => None,
        };
        let extra_headers = headers
            .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v))
            .collect();

        Ok(Self {
            object,
            target_type,
            tag_name,
            tagger,
            extra_headers,
            message: message.to_vec(),
        })
    }

    /// Encode into the canonical payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.message.len());
        write_header(&mut out, "object", self.object.to_hex().as_bytes());
        write_header(&mut out, "type", self.target_type.as_bytes());
        write_header(&mut out, "tag", self.tag_name.as_bytes());
        if let Some(tagger) = &self.tagger {
            write_header(&mut out, "tagger", tagger.to_string().as_bytes());
        }
        for (key, value) in &self.extra_headers {
            write_header(&mut out, key, value);
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// Convert into a `RawObject` for storage.
    pub fn to_raw(&self) -> RawObject {
        RawObject::new(ObjectType::Tag, self.encode())
    }

    /// First paragraph of the message on a single line.
    pub fn short_message(&self) -> String {
        short_message(&self.message)
    }

    /// The complete message, lossily decoded as UTF-8.
    pub fn full_message(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn parse_and_encode() {
        let raw = format!(
            "object {TARGET}\ntype commit\ntag v1.0\ntagger T <t@example.com> 1700000000 +0100\n\nRelease 1.0\nnotes\n"
        );
        let tag = Tag::parse(raw.as_bytes()).unwrap();
        assert_eq!(tag.object.to_hex(), TARGET);
        assert_eq!(tag.target_type, ObjectType::Commit);
        assert_eq!(tag.tag_name, "v1.0");
        assert_eq!(tag.tagger.as_ref().unwrap().tz_offset, 60);
        assert_eq!(tag.short_message(), "Release 1.0 notes");
        assert_eq!(tag.encode(), raw.into_bytes());
    }

    #[test]
    fn tagger_is_optional() {
        let raw = format!("object {TARGET}\ntype blob\ntag old\n\nancient");
        let tag = Tag::parse(raw.as_bytes()).unwrap();
        assert!(tag.tagger.is_none());
        assert_eq!(tag.target_type, ObjectType::Blob);
        assert_eq!(tag.full_message(), "ancient");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(Tag::parse(b"type commit\n").is_err());
        let bad_type = format!("object {TARGET}\ntype widget\ntag x\n\n");
        assert!(Tag::parse(bad_type.as_bytes()).is_err());
        let no_name = format!("object {TARGET}\ntype commit\n\n");
        assert!(Tag::parse(no_name.as_bytes()).is_err());
    }
}
