//! Revision expression resolution.
//!
//! Grammar (a subset of git's):
//!
//! ```text
//! expr   := base suffix* [":" path]
//! base   := <40 hex> | <ref name> | <abbreviated hex, 4+ chars>
//! suffix := "^" [N] | "~" [N] | "^{" [type] "}"
//! ```
//!
//! Ref names are tried as `X`, `refs/X`, `refs/tags/X`, `refs/heads/X`,
//! `refs/remotes/X` and `refs/remotes/X/HEAD`, first match wins.

use arbor_refs::validate_ref_name;
use arbor_types::{ObjectId, ObjectType};

use crate::database::ObjectDatabase;
use crate::error::{StoreError, StoreResult};

const MIN_ABBREV: usize = 4;

struct Parser<'a> {
    expr: &'a str,
}

impl Parser<'_> {
    fn syntax(&self, reason: impl Into<String>) -> StoreError {
        StoreError::RevisionSyntax {
            expr: self.expr.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn resolve(odb: &ObjectDatabase, expr: &str) -> StoreResult<Option<ObjectId>> {
    let p = Parser { expr };
    if expr.is_empty() {
        return Err(p.syntax("empty revision"));
    }
    let (rev, path) = match expr.split_once(':') {
        Some((rev, path)) => (rev, Some(path)),
        None => (expr, None),
    };
    if rev.is_empty() {
        return Err(p.syntax("index paths are not supported"));
    }

    let split = rev.find(['^', '~']).unwrap_or(rev.len());
    let (base, suffix) = rev.split_at(split);
    if base.is_empty() {
        return Err(p.syntax("missing name before '^' or '~'"));
    }
    if base.contains("..") {
        return Err(p.syntax("ranges are not single revisions"));
    }
    if base.contains("@{") {
        return Err(p.syntax("reflog expressions are not supported"));
    }

    let Some(mut id) = resolve_base(odb, &p, base)? else {
        return Ok(None);
    };

    let s = suffix.as_bytes();
    let mut i = 0;
    while i < s.len() {
        match s[i] {
            b'^' if s.get(i + 1) == Some(&b'{') => {
                let close = s[i..]
                    .iter()
                    .position(|&b| b == b'}')
                    .map(|c| i + c)
                    .ok_or_else(|| p.syntax("unterminated '^{'"))?;
                let what = &suffix[i + 2..close];
                i = close + 1;
                id = match what {
                    "" => odb.peel(&id)?.0,
                    "object" => id,
                    "commit" => odb.peel_to(&id, ObjectType::Commit)?,
                    "tree" => odb.peel_to(&id, ObjectType::Tree)?,
                    "blob" => odb.peel_to(&id, ObjectType::Blob)?,
                    "tag" => odb.peel_to(&id, ObjectType::Tag)?,
                    other => return Err(p.syntax(format!("unknown peel type {other:?}"))),
                };
            }
            b'^' => {
                let (n, used) = read_number(&p, &s[i + 1..])?;
                i += 1 + used;
                let n = n.unwrap_or(1);
                if n == 0 {
                    id = odb.peel_to(&id, ObjectType::Commit)?;
                    continue;
                }
                match nth_parent(odb, &id, n)? {
                    Some(parent) => id = parent,
                    None => return Ok(None),
                }
            }
            b'~' => {
                let (n, used) = read_number(&p, &s[i + 1..])?;
                i += 1 + used;
                for _ in 0..n.unwrap_or(1) {
                    match nth_parent(odb, &id, 1)? {
                        Some(parent) => id = parent,
                        None => return Ok(None),
                    }
                }
                if n == Some(0) {
                    id = odb.peel_to(&id, ObjectType::Commit)?;
                }
            }
            other => {
                return Err(p.syntax(format!("unexpected {:?} after '^'/'~'", other as char)));
            }
        }
    }

    match path {
        Some(path) => lookup_path(odb, &id, path),
        None => Ok(Some(id)),
    }
}

fn read_number(p: &Parser<'_>, s: &[u8]) -> StoreResult<(Option<usize>, usize)> {
    let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Ok((None, 0));
    }
    let text = std::str::from_utf8(&s[..digits]).map_err(|_| p.syntax("bad number"))?;
    let n = text.parse().map_err(|_| p.syntax("number out of range"))?;
    Ok((Some(n), digits))
}

fn nth_parent(odb: &ObjectDatabase, id: &ObjectId, n: usize) -> StoreResult<Option<ObjectId>> {
    let commit = odb.map_commit(&odb.peel_to(id, ObjectType::Commit)?)?;
    Ok(commit.parents.get(n - 1).copied())
}

fn resolve_base(odb: &ObjectDatabase, p: &Parser<'_>, base: &str) -> StoreResult<Option<ObjectId>> {
    if ObjectId::is_id(base) {
        return ObjectId::from_hex(base)
            .map(Some)
            .map_err(|e| p.syntax(e.to_string()));
    }

    let candidates = [
        base.to_string(),
        format!("refs/{base}"),
        format!("refs/tags/{base}"),
        format!("refs/heads/{base}"),
        format!("refs/remotes/{base}"),
        format!("refs/remotes/{base}/HEAD"),
    ];
    for name in &candidates {
        if validate_ref_name(name).is_err() {
            continue;
        }
        if let Some(id) = odb.refs().resolve(name)? {
            return Ok(Some(id));
        }
    }

    if base.len() >= MIN_ABBREV && base.bytes().all(|b| b.is_ascii_hexdigit()) {
        let matches = odb.objects().resolve_prefix(&base.to_ascii_lowercase())?;
        return match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(p.syntax(format!("abbreviated id {base} is ambiguous"))),
        };
    }
    Ok(None)
}

fn lookup_path(odb: &ObjectDatabase, id: &ObjectId, path: &str) -> StoreResult<Option<ObjectId>> {
    let mut current = odb.peel_to(id, ObjectType::Tree)?;
    let mut is_tree = true;
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if !is_tree {
            return Ok(None);
        }
        let tree = odb.map_tree(&current)?;
        let Some(entry) = tree.find(component.as_bytes()) else {
            return Ok(None);
        };
        current = entry.id;
        is_tree = entry.is_tree();
    }
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arbor_refs::{InMemoryRefStore, RefStore, RefUpdate};
    use arbor_types::FileMode;

    use super::*;
    use crate::commit::Commit;
    use crate::ident::PersonIdent;
    use crate::memory::InMemoryObjectStore;
    use crate::object::RawObject;
    use crate::tag::Tag;
    use crate::tree::{Tree, TreeEntry};

    struct Fixture {
        odb: ObjectDatabase,
        objects: Arc<InMemoryObjectStore>,
        refs: Arc<InMemoryRefStore>,
        tree: ObjectId,
        file: ObjectId,
        root: ObjectId,
        side: ObjectId,
        second: ObjectId,
        merge: ObjectId,
    }

    fn commit(odb: &ObjectDatabase, tree: ObjectId, parents: Vec<ObjectId>, when: i64) -> ObjectId {
        let who = PersonIdent::new("T", "t@example.com", when, 0);
        odb.insert_commit(&Commit {
            tree,
            parents,
            author: who.clone(),
            committer: who,
            encoding: None,
            extra_headers: Vec::new(),
            message: format!("commit at {when}\n").into_bytes(),
        })
        .unwrap()
    }

    // root <- second <- merge
    //   ^               /
    //   +---- side <---+
    fn fixture() -> Fixture {
        let objects = Arc::new(InMemoryObjectStore::new());
        let refs = Arc::new(InMemoryRefStore::new());
        let odb = ObjectDatabase::new(objects.clone(), refs.clone());

        let file = odb.insert_blob(b"hello\n").unwrap();
        let sub = odb
            .insert_tree(&Tree::from_entries(vec![TreeEntry::new(FileMode::REGULAR_FILE, "file.txt", file)]).unwrap())
            .unwrap();
        let tree = odb
            .insert_tree(&Tree::from_entries(vec![TreeEntry::new(FileMode::TREE, "dir", sub)]).unwrap())
            .unwrap();

        let root = commit(&odb, tree, vec![], 1);
        let second = commit(&odb, tree, vec![root], 2);
        let side = commit(&odb, tree, vec![root], 3);
        let merge = commit(&odb, tree, vec![second, side], 4);

        refs.update(&RefUpdate::new("refs/heads/main", merge)).unwrap();
        refs.update(&RefUpdate::new("refs/heads/side", side)).unwrap();
        refs.update(&RefUpdate::new("refs/remotes/origin/main", second)).unwrap();
        refs.link("HEAD", "refs/heads/main").unwrap();

        Fixture {
            odb,
            objects,
            refs,
            tree,
            file,
            root,
            side,
            second,
            merge,
        }
    }

    fn resolve(f: &Fixture, expr: &str) -> Option<ObjectId> {
        f.odb.resolve(expr).unwrap()
    }

    fn assert_syntax(f: &Fixture, expr: &str) {
        match f.odb.resolve(expr) {
            Err(StoreError::RevisionSyntax { .. }) => {}
            other => panic!("{expr:?}: expected syntax error, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    #[test]
    fn resolves_head_and_branches() {
        let f = fixture();
        assert_eq!(resolve(&f, "HEAD"), Some(f.merge));
        assert_eq!(resolve(&f, "main"), Some(f.merge));
        assert_eq!(resolve(&f, "refs/heads/side"), Some(f.side));
        assert_eq!(resolve(&f, "heads/side"), Some(f.side));
        assert_eq!(resolve(&f, "origin/main"), Some(f.second));
    }

    #[test]
    fn tags_win_over_branches() {
        let f = fixture();
        f.refs.update(&RefUpdate::new("refs/tags/side", f.root)).unwrap();
        assert_eq!(resolve(&f, "side"), Some(f.root));
    }

    #[test]
    fn remote_head_fallback() {
        let f = fixture();
        f.refs.link("refs/remotes/origin/HEAD", "refs/remotes/origin/main").unwrap();
        assert_eq!(resolve(&f, "origin"), Some(f.second));
    }

    #[test]
    fn unknown_names_are_not_found() {
        let f = fixture();
        assert_eq!(resolve(&f, "nope"), None);
        assert_eq!(resolve(&f, "nope~2"), None);
    }

    #[test]
    fn full_and_abbreviated_ids() {
        let f = fixture();
        assert_eq!(resolve(&f, &f.root.to_hex()), Some(f.root));
        assert_eq!(resolve(&f, &f.root.to_hex()[..10]), Some(f.root));
        assert_eq!(resolve(&f, &f.root.to_hex()[..10].to_uppercase()), Some(f.root));
    }

    #[test]
    fn ambiguous_abbreviation_is_a_syntax_error() {
        let f = fixture();
        let mut a = [0u8; 20];
        a[0] = 0xab;
        a[1] = 0xcd;
        let mut b = a;
        b[2] = 1;
        let blob = RawObject::new(ObjectType::Blob, Vec::new());
        f.objects.insert_unchecked(ObjectId::from_raw(a), blob.clone());
        f.objects.insert_unchecked(ObjectId::from_raw(b), blob);
        assert_syntax(&f, "abcd");
        assert_eq!(resolve(&f, "abcd000000"), Some(ObjectId::from_raw(a)));
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    #[test]
    fn parent_and_ancestor_suffixes() {
        let f = fixture();
        assert_eq!(resolve(&f, "HEAD^"), Some(f.second));
        assert_eq!(resolve(&f, "HEAD^1"), Some(f.second));
        assert_eq!(resolve(&f, "HEAD^2"), Some(f.side));
        assert_eq!(resolve(&f, "HEAD^3"), None);
        assert_eq!(resolve(&f, "HEAD~"), Some(f.second));
        assert_eq!(resolve(&f, "HEAD~2"), Some(f.root));
        assert_eq!(resolve(&f, "HEAD~3"), None);
        assert_eq!(resolve(&f, "HEAD^2~1"), Some(f.root));
        assert_eq!(resolve(&f, "HEAD^^"), Some(f.root));
        assert_eq!(resolve(&f, "HEAD^0"), Some(f.merge));
        assert_eq!(resolve(&f, "HEAD~0"), Some(f.merge));
    }

    #[test]
    fn peel_suffixes() {
        let f = fixture();
        let tag = f
            .odb
            .insert_tag(&Tag {
                object: f.side,
                target_type: ObjectType::Commit,
                tag_name: "v1".into(),
                tagger: None,
                extra_headers: Vec::new(),
                message: Vec::new(),
            })
            .unwrap();
        f.refs.update(&RefUpdate::new("refs/tags/v1", tag)).unwrap();

        assert_eq!(resolve(&f, "v1"), Some(tag));
        assert_eq!(resolve(&f, "v1^{}"), Some(f.side));
        assert_eq!(resolve(&f, "v1^{commit}"), Some(f.side));
        assert_eq!(resolve(&f, "v1^{tag}"), Some(tag));
        assert_eq!(resolve(&f, "v1^{tree}"), Some(f.tree));
        assert_eq!(resolve(&f, "v1^0"), Some(f.side));
        assert_eq!(resolve(&f, "v1^"), Some(f.root));
        assert!(f.odb.resolve("HEAD^{blob}").is_err());
    }

    #[test]
    fn path_lookup() {
        let f = fixture();
        assert_eq!(resolve(&f, "HEAD:dir/file.txt"), Some(f.file));
        assert_eq!(resolve(&f, "HEAD~1:dir/file.txt"), Some(f.file));
        assert_eq!(resolve(&f, "HEAD:"), Some(f.tree));
        assert_eq!(resolve(&f, "HEAD:dir/missing"), None);
        assert_eq!(resolve(&f, "HEAD:dir/file.txt/deeper"), None);
    }

    // -----------------------------------------------------------------------
    // Syntax errors
    // -----------------------------------------------------------------------

    #[test]
    fn malformed_expressions() {
        let f = fixture();
        for expr in ["", ":dir", "^HEAD", "~1", "HEAD^{foo}", "HEAD^{commit", "HEAD~x", "HEAD^!", "a..b", "HEAD@{1}"] {
            assert_syntax(&f, expr);
        }
    }
}
