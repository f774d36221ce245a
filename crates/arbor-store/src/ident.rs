use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Author, committer, or tagger identity with a timestamp.
///
/// Encoded as `Name <email> <epoch-seconds> <±HHMM>`. When parsed bytes do
/// not match that form exactly (a `-0000` offset, extra spaces before the
/// `<`, an unreadable date), the original bytes are kept and written back
/// as long as the decoded fields are unchanged, so re-encoding an object
/// reproduces its id. Equality and hashing look at the decoded fields only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch.
    pub when: i64,
    /// Offset from UTC in minutes.
    pub tz_offset: i32,
    #[serde(skip)]
    raw: Option<Vec<u8>>,
}

impl PersonIdent {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: i64, tz_offset: i32) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
            tz_offset,
            raw: None,
        }
    }

    /// Parse the value part of an `author`/`committer`/`tagger` header.
    ///
    /// A missing or unreadable date yields `when = 0` and offset `0`, the
    /// way git tolerates identities written by old tools.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let mut ident = Self::decode(raw)?;
        if ident.canonical().as_bytes() != raw {
            ident.raw = Some(raw.to_vec());
        }
        Ok(ident)
    }

    fn decode(raw: &[u8]) -> Result<Self, ParseError> {
        let lt = raw
            .iter()
            .position(|&b| b == b'<')
            .ok_or_else(|| ParseError::new("identity has no '<'"))?;
        let gt = raw[lt..]
            .iter()
            .position(|&b| b == b'>')
            .map(|p| lt + p)
            .ok_or_else(|| ParseError::new("identity has no '>'"))?;

        let name = String::from_utf8_lossy(raw[..lt].trim_ascii_end()).into_owned();
        let email = String::from_utf8_lossy(&raw[lt + 1..gt]).into_owned();

        let mut fields = raw[gt + 1..].split(|&b| b == b' ').filter(|f| !f.is_empty());
        let when = fields
            .next()
            .and_then(|f| std::str::from_utf8(f).ok())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let tz_offset = fields.next().and_then(parse_tz).unwrap_or(0);

        Ok(Self::new(name, email, when, tz_offset))
    }

    /// Bytes this identity was parsed from, if they still describe it and
    /// differ from the canonical form.
    fn preserved(&self) -> Option<&[u8]> {
        let raw = self.raw.as_deref()?;
        let decoded = Self::decode(raw).ok()?;
        (decoded == *self).then_some(raw)
    }

    fn canonical(&self) -> String {
        format!("{} <{}> {} {}", self.name, self.email, self.when, self.tz_string())
    }

    /// Append the canonical encoding.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self.preserved() {
            Some(raw) => out.extend_from_slice(raw),
            None => out.extend_from_slice(self.canonical().as_bytes()),
        }
    }

    /// The offset rendered as `±HHMM`.
    pub fn tz_string(&self) -> String {
        let sign = if self.tz_offset < 0 { '-' } else { '+' };
        let abs = self.tz_offset.unsigned_abs();
        format!("{sign}{:02}{:02}", abs / 60, abs % 60)
    }
}

fn parse_tz(field: &[u8]) -> Option<i32> {
    let (sign, digits) = match field.first()? {
        b'+' => (1, &field[1..]),
        b'-' => (-1, &field[1..]),
        _ => (1, field),
    };
    if digits.len() != 4 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value: i32 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some(sign * ((value / 100) * 60 + value % 100))
}

impl PartialEq for PersonIdent {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.email == other.email
            && self.when == other.when
            && self.tz_offset == other.tz_offset
    }
}

impl Eq for PersonIdent {}

impl Hash for PersonIdent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.email.hash(state);
        self.when.hash(state);
        self.tz_offset.hash(state);
    }
}

impl fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preserved() {
            Some(raw) => f.write_str(&String::from_utf8_lossy(raw)),
            None => f.write_str(&self.canonical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_standard_identity() {
        let ident = PersonIdent::parse(b"A U Thor <author@example.com> 1142878449 +0230").unwrap();
        assert_eq!(ident.name, "A U Thor");
        assert_eq!(ident.email, "author@example.com");
        assert_eq!(ident.when, 1142878449);
        assert_eq!(ident.tz_offset, 150);
    }

    #[test]
    fn negative_offsets() {
        let ident = PersonIdent::parse(b"X <x@y> 0 -0130").unwrap();
        assert_eq!(ident.tz_offset, -90);
        assert_eq!(ident.tz_string(), "-0130");
    }

    #[test]
    fn encode_roundtrip() {
        let raw = b"Jane Doe <jane@example.org> 1700000000 -0800";
        let ident = PersonIdent::parse(raw).unwrap();
        let mut out = Vec::new();
        ident.encode_into(&mut out);
        assert_eq!(out, raw.to_vec());
    }

    #[test]
    fn missing_date_is_tolerated() {
        let ident = PersonIdent::parse(b"Old Tool <old@tool>").unwrap();
        assert_eq!(ident.when, 0);
        assert_eq!(ident.tz_offset, 0);
    }

    fn reencode(raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        PersonIdent::parse(raw).unwrap().encode_into(&mut out);
        out
    }

    #[test]
    fn non_canonical_bytes_are_reproduced() {
        for raw in [
            b"Jane <jane@example.org> 1700000000 -0000".as_slice(),
            b"Jane  <jane@example.org> 1700000000 +0100",
            b"Jane <jane@example.org> yesterday +0100",
            b"Jane <jane@example.org>",
        ] {
            assert_eq!(reencode(raw), raw.to_vec());
        }
        let negative_zero = PersonIdent::parse(b"J <j@x> 5 -0000").unwrap();
        assert_eq!(negative_zero.tz_offset, 0);
        assert_eq!(negative_zero, PersonIdent::new("J", "j@x", 5, 0));
        assert_eq!(negative_zero.to_string(), "J <j@x> 5 -0000");
    }

    #[test]
    fn edited_fields_encode_canonically() {
        let mut ident = PersonIdent::parse(b"Jane  <jane@example.org> 1700000000 -0000").unwrap();
        ident.when = 1700000001;
        let mut out = Vec::new();
        ident.encode_into(&mut out);
        assert_eq!(out, b"Jane <jane@example.org> 1700000001 +0000".to_vec());
    }

    #[test]
    fn json_roundtrip() {
        let ident = PersonIdent::new("A U Thor", "author@example.com", 1142878449, -300);
        let json = serde_json::to_value(&ident).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "A U Thor",
                "email": "author@example.com",
                "when": 1142878449,
                "tz_offset": -300,
            })
        );
        let back: PersonIdent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ident);
    }

    #[test]
    fn empty_email_is_allowed() {
        let ident = PersonIdent::parse(b"nobody <> 10 +0000").unwrap();
        assert_eq!(ident.email, "");
        assert_eq!(ident.when, 10);
    }

    #[test]
    fn rejects_missing_brackets() {
        assert!(PersonIdent::parse(b"no email here 10 +0000").is_err());
        assert!(PersonIdent::parse(b"broken <email 10 +0000").is_err());
    }
}
