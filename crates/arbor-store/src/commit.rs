//! Canonical commit encoding.
//!
//! ```text
//! tree <hex>\n
//! parent <hex>\n          (zero or more, in order)
//! author <ident>\n
//! committer <ident>\n
//! encoding <name>\n       (optional)
//! <key> <value>\n         (optional extra headers; continuation lines
//!  <more value>\n          start with a single space)
//! \n
//! <message>
//! ```
//!
//! A commit with no blank line after its headers has an empty message.

use arbor_types::{ObjectId, ObjectType};

use crate::error::ParseError;
use crate::ident::PersonIdent;
use crate::object::RawObject;

/// A parsed commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    /// Parents in recorded order; the first is the mainline.
    pub parents: Vec<ObjectId>,
    pub author: PersonIdent,
    pub committer: PersonIdent,
    /// Value of the `encoding` header, if present.
    pub encoding: Option<String>,
    /// Other headers (`gpgsig`, `mergetag`, ...) in recorded order. Multi-line
    /// values are joined with `\n`.
    pub extra_headers: Vec<(String, Vec<u8>)>,
    pub message: Vec<u8>,
}

impl Commit {
    /// Decode a commit payload.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let (headers, message) = split_headers(data)?;
        let mut headers = headers.into_iter().peekable();

        let tree = match headers.next() {
            Some((b"tree", value)) => parse_id(&value, "tree")?,
            _ => return Err(ParseError::new("commit does not start with a tree header")),
        };

        let mut parents = Vec::new();
        while let Some((b"parent", _)) = headers.peek() {
            if let Some((_, value)) = headers.next() {
                parents.push(parse_id(&value, "parent")?);
            }
        }

        let author = match headers.next() {
            Some((b"author", value)) => PersonIdent::parse(&value)?,
            _ => return Err(ParseError::new("commit has no author header")),
        };
        let committer = match headers.next() {
            Some((b"committer", value)) => PersonIdent::parse(&value)?,
            _ => return Err(ParseError::new("commit has no committer header")),
        };

        let mut encoding = None;
        let mut extra_headers = Vec::new();
        for (key, value) in headers {
            match key {
                b"tree" | b"parent" | b"author" | b"committer" => {
                    return Err(ParseError::new(format!(
                        "misplaced {} header",
                        String::from_utf8_lossy(key)
                    )));
                }
                b"encoding" if encoding.is_none() => {
                    encoding = Some(String::from_utf8_lossy(&value).into_owned());
                }
                _ => extra_headers.push((String::from_utf8_lossy(key).into_owned(), value)),
            }
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            encoding,
            extra_headers,
            message: message.to_vec(),
        })
    }

    /// Encode into the canonical payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256 + self.message.len());
        write_header(&mut out, "tree", self.tree.to_hex().as_bytes());
        for parent in &self.parents {
            write_header(&mut out, "parent", parent.to_hex().as_bytes());
        }
        write_header(&mut out, "author", self.author.to_string().as_bytes());
        write_header(&mut out, "committer", self.committer.to_string().as_bytes());
        if let Some(encoding) = &self.encoding {
            write_header(&mut out, "encoding", encoding.as_bytes());
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
        RawObject::new(ObjectType::Commit, self.encode())
    }

    /// First paragraph of the message on a single line.
    pub fn short_message(&self) -> String {
        short_message(&self.message)
    }

    /// The complete message, lossily decoded as UTF-8.
    pub fn full_message(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }

    /// Returns `true` if the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Header lines as `(key, value)` pairs plus the message after the blank line.
pub(crate) type Headers<'a> = Vec<(&'a [u8], Vec<u8>)>;

/// Split a commit or tag payload into headers and message.
pub(crate) fn split_headers(data: &[u8]) -> Result<(Headers<'_>, &[u8]), ParseError> {
    let mut headers: Headers<'_> = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let end = data[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |p| pos + p);
        let line = &data[pos..end];
        let next = (end + 1).min(data.len());

        if line.is_empty() {
            return Ok((headers, &data[next..]));
        }
        if line[0] == b' ' {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| ParseError::new("continuation line without a header"))?;
            value.push(b'\n');
            value.extend_from_slice(&line[1..]);
        } else {
            let space = line
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ParseError::new("header line has no value"))?;
            headers.push((&line[..space], line[space + 1..].to_vec()));
        }
        pos = next;
        if end == data.len() {
            break;
        }
    }
    Ok((headers, &[]))
}

/// Write one header, continuing multi-line values with a leading space.
pub(crate) fn write_header(out: &mut Vec<u8>, key: &str, value: &[u8]) {
    out.extend_from_slice(key.as_bytes());
    out.push(b' ');
    for (i, line) in value.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\n ");
        }
        out.extend_from_slice(line);
    }
    out.push(b'\n');
}

pub(crate) fn parse_id(value: &[u8], field: &str) -> Result<ObjectId, ParseError> {
    let hex = std::str::from_utf8(value).map_err(|_| ParseError::new(format!("{field} id is not ASCII")))?;
    ObjectId::from_hex(hex).map_err(|e| ParseError::new(format!("bad {field} id: {e}")))
}

/// The first paragraph of `message`, newlines folded into spaces.
///
/// The paragraph ends at the first blank line or the end of input. Trailing
/// newlines of the paragraph are dropped before folding.
pub(crate) fn short_message(message: &[u8]) -> String {
    let mut end = message
        .windows(2)
        .position(|w| w == b"\n\n")
        .unwrap_or(message.len());
    while end > 0 && matches!(message[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    let paragraph = String::from_utf8_lossy(&message[..end]);
    if !paragraph.contains('\n') {
        return paragraph.into_owned();
    }
    paragraph.replace("\r\n", " ").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
    const PARENT: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    fn body(message: &str) -> Vec<u8> {
        format!(
            "tree {TREE}\nparent {PARENT}\nauthor A <a@example.com> 1000 +0000\ncommitter C <c@example.com> 2000 -0500\n\n{message}"
        )
        .into_bytes()
    }

    fn commit_with(message: &[u8]) -> Commit {
        let mut c = Commit::parse(&body("")).unwrap();
        c.message = message.to_vec();
        c
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parse_all_fields() {
        let c = Commit::parse(&body("subject\n\nbody\n")).unwrap();
        assert_eq!(c.tree.to_hex(), TREE);
        assert_eq!(c.parents.len(), 1);
        assert_eq!(c.parents[0].to_hex(), PARENT);
        assert_eq!(c.author.when, 1000);
        assert_eq!(c.committer.when, 2000);
        assert_eq!(c.committer.tz_offset, -300);
        assert_eq!(c.full_message(), "subject\n\nbody\n");
        assert!(!c.is_merge());
    }

    #[test]
    fn parent_order_is_preserved() {
        let raw = format!(
            "tree {TREE}\nparent {PARENT}\nparent {TREE}\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000\n\nmerge"
        );
        let c = Commit::parse(raw.as_bytes()).unwrap();
        assert_eq!(c.parents[0].to_hex(), PARENT);
        assert_eq!(c.parents[1].to_hex(), TREE);
        assert!(c.is_merge());
    }

    #[test]
    fn no_blank_line_means_empty_message() {
        let raw = format!("tree {TREE}\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000\n");
        let c = Commit::parse(raw.as_bytes()).unwrap();
        assert!(c.parents.is_empty());
        assert!(c.message.is_empty());
        assert_eq!(c.short_message(), "");

        let unterminated = format!("tree {TREE}\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000");
        assert!(Commit::parse(unterminated.as_bytes()).unwrap().message.is_empty());
    }

    #[test]
    fn encoding_and_continuation_headers() {
        let raw = format!(
            "tree {TREE}\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000\nencoding ISO-8859-1\ngpgsig -----BEGIN-----\n line two\n -----END-----\n\nsigned\n"
        );
        let c = Commit::parse(raw.as_bytes()).unwrap();
        assert_eq!(c.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(c.extra_headers.len(), 1);
        assert_eq!(c.extra_headers[0].0, "gpgsig");
        assert_eq!(c.extra_headers[0].1, b"-----BEGIN-----\nline two\n-----END-----".to_vec());
        assert_eq!(c.encode(), raw.into_bytes());
    }

    #[test]
    fn encode_reproduces_canonical_bytes() {
        let raw = body("hello\n");
        assert_eq!(Commit::parse(&raw).unwrap().encode(), raw);
    }

    #[test]
    fn corrupt_commits_are_rejected() {
        assert!(Commit::parse(b"").is_err());
        assert!(Commit::parse(b"parent x\n").is_err());
        let bad_tree = "tree nothex\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000\n\n";
        assert!(Commit::parse(bad_tree.as_bytes()).is_err());
        let no_committer = format!("tree {TREE}\nauthor A <a> 1 +0000\n\nmsg");
        assert!(Commit::parse(no_committer.as_bytes()).is_err());
        let late_parent = format!(
            "tree {TREE}\nauthor A <a> 1 +0000\ncommitter A <a> 1 +0000\nparent {PARENT}\n\n"
        );
        assert!(Commit::parse(late_parent.as_bytes()).is_err());
    }

    // -----------------------------------------------------------------------
    // Short message
    // -----------------------------------------------------------------------

    #[test]
    fn short_message_empty() {
        assert_eq!(commit_with(b"").short_message(), "");
    }

    #[test]
    fn short_message_single_newline() {
        assert_eq!(commit_with(b"\n").short_message(), "");
    }

    #[test]
    fn short_message_folds_lines() {
        assert_eq!(commit_with(b"a\nb").short_message(), "a b");
    }

    #[test]
    fn short_message_strips_trailing_newline() {
        assert_eq!(commit_with(b"a\nb\n").short_message(), "a b");
    }

    #[test]
    fn short_message_stops_at_blank_line() {
        assert_eq!(commit_with(b"subject\n\nbody\nmore").short_message(), "subject");
        assert_eq!(commit_with(b"one\ntwo\n\nthree").short_message(), "one two");
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn ident() -> impl Strategy<Value = PersonIdent> {
            (
                "[A-Za-z]([A-Za-z. ]{0,14}[A-Za-z])?",
                "[a-z0-9.@+-]{0,16}",
                -1_000_000_000_000i64..1_000_000_000_000,
                -720i32..=840,
            )
                .prop_map(|(name, email, when, tz)| PersonIdent::new(name, email, when, tz))
        }

        fn commit() -> impl Strategy<Value = Commit> {
            (
                any::<[u8; 20]>(),
                proptest::collection::vec(any::<[u8; 20]>(), 0..4),
                ident(),
                ident(),
                proptest::option::of("[A-Za-z0-9-]{1,12}"),
                proptest::collection::vec(any::<u8>(), 0..64),
            )
                .prop_map(|(tree, parents, author, committer, encoding, message)| Commit {
                    tree: ObjectId::from_raw(tree),
                    parents: parents.into_iter().map(ObjectId::from_raw).collect(),
                    author,
                    committer,
                    encoding,
                    extra_headers: Vec::new(),
                    message,
                })
        }

        proptest! {
            #[test]
            fn encoded_commits_parse_back(c in commit()) {
                let bytes = c.encode();
                let parsed = Commit::parse(&bytes).unwrap();
                prop_assert_eq!(&parsed, &c);
                prop_assert_eq!(parsed.encode(), bytes);
            }

            #[test]
            fn identity_bytes_survive_reencoding(
                name in "[A-Za-z][A-Za-z ]{0,12}",
                email in "[a-z0-9.@]{0,12}",
                when in 0u64..10_000_000_000,
                tz in "[+-][0-9]{4}",
            ) {
                let value = format!("{name} <{email}> {when} {tz}");
                let raw = format!("tree {TREE}\nauthor {value}\ncommitter {value}\n\nmsg\n");
                let parsed = Commit::parse(raw.as_bytes()).unwrap();
                prop_assert_eq!(parsed.encode(), raw.into_bytes());
            }
        }
    }
}
