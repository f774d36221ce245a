use std::fmt;
use std::sync::Arc;

use arbor_refs::{InMemoryRefStore, RefStore};
use arbor_types::{ObjectId, ObjectType};
use tracing::{debug, warn};

use crate::commit::Commit;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryObjectStore;
use crate::object::{Blob, RawObject};
use crate::revparse;
use crate::tag::Tag;
use crate::traits::ObjectStore;
use crate::tree::Tree;

/// Typed access to an object store plus the refs naming its objects.
///
/// `ObjectDatabase` is the entry point walkers and the repository facade use:
/// it opens objects with type checks, decodes them with the canonical codecs,
/// writes new objects, and resolves revision expressions. Cloning is cheap;
/// clones share the underlying stores.
#[derive(Clone)]
pub struct ObjectDatabase {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl ObjectDatabase {
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self { objects, refs }
    }

    /// A database backed entirely by memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// The underlying object store.
    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    /// The ref store used to resolve names.
    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    /// Returns `true` if the object exists.
    pub fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        self.objects.exists(id)
    }

    /// Open an object of any type.
    pub fn open(&self, id: &ObjectId) -> StoreResult<RawObject> {
        self.objects
            .read(id)?
            .ok_or(StoreError::MissingObject(*id))
    }

    /// Open an object that must be of type `expected`.
    pub fn open_typed(&self, id: &ObjectId, expected: ObjectType) -> StoreResult<RawObject> {
        let object = self.open(id)?;
        if object.kind != expected {
            return Err(StoreError::IncorrectType {
                id: *id,
                expected,
                actual: object.kind,
            });
        }
        Ok(object)
    }

    /// Store a payload of the given type and return its id.
    pub fn write(&self, kind: ObjectType, data: &[u8]) -> StoreResult<ObjectId> {
        self.write_raw(&RawObject::new(kind, data.to_vec()))
    }

    fn write_raw(&self, object: &RawObject) -> StoreResult<ObjectId> {
        let id = self.objects.write(object)?;
        debug!(%id, kind = %object.kind, size = object.size(), "object inserted");
        Ok(id)
    }

    pub fn insert_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(ObjectType::Blob, data)
    }

    pub fn insert_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write_raw(&tree.to_raw())
    }

    pub fn insert_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write_raw(&commit.to_raw())
    }

    pub fn insert_tag(&self, tag: &Tag) -> StoreResult<ObjectId> {
        self.write_raw(&tag.to_raw())
    }

    pub fn map_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        let object = self.open_typed(id, ObjectType::Blob)?;
        Ok(Blob::new(object.data))
    }

    pub fn map_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let object = self.open_typed(id, ObjectType::Tree)?;
        Tree::parse(&object.data).map_err(|e| corrupt(id, e))
    }

    pub fn map_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        let object = self.open_typed(id, ObjectType::Commit)?;
        Commit::parse(&object.data).map_err(|e| corrupt(id, e))
    }

    pub fn map_tag(&self, id: &ObjectId) -> StoreResult<Tag> {
        let object = self.open_typed(id, ObjectType::Tag)?;
        Tag::parse(&object.data).map_err(|e| corrupt(id, e))
    }

    /// Type of the object stored under `id`.
    pub fn object_type(&self, id: &ObjectId) -> StoreResult<ObjectType> {
        Ok(self.open(id)?.kind)
    }

    /// Follow annotated tags to the first non-tag object.
    pub fn peel(&self, id: &ObjectId) -> StoreResult<(ObjectId, ObjectType)> {
        let mut current = *id;
        loop {
            let object = self.open(&current)?;
            if object.kind != ObjectType::Tag {
                return Ok((current, object.kind));
            }
            let tag = Tag::parse(&object.data).map_err(|e| corrupt(&current, e))?;
            current = tag.object;
        }
    }

    /// Peel `id` until it is an object of type `kind`.
    ///
    /// Tags are followed, and a commit peels to its tree when a tree is
    /// requested.
    pub fn peel_to(&self, id: &ObjectId, kind: ObjectType) -> StoreResult<ObjectId> {
        if kind == ObjectType::Tag {
            self.open_typed(id, ObjectType::Tag)?;
            return Ok(*id);
        }
        let (peeled, actual) = self.peel(id)?;
        match (actual, kind) {
            (a, k) if a == k => Ok(peeled),
            (ObjectType::Commit, ObjectType::Tree) => Ok(self.map_commit(&peeled)?.tree),
            (actual, expected) => Err(StoreError::IncorrectType {
                id: peeled,
                expected,
                actual,
            }),
        }
    }

    /// Resolve a revision expression to an object id.
    ///
    /// Returns `Ok(None)` if a name does not exist or a navigation step
    /// leads nowhere; malformed expressions fail with
    /// [`StoreError::RevisionSyntax`].
    pub fn resolve(&self, expr: &str) -> StoreResult<Option<ObjectId>> {
        revparse::resolve(self, expr)
    }
}

fn corrupt(id: &ObjectId, e: crate::error::ParseError) -> StoreError {
    warn!(%id, reason = %e, "rejecting corrupt object");
    e.into_corrupt(*id)
}

impl fmt::Debug for ObjectDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDatabase").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PersonIdent;
    use crate::tree::TreeEntry;
    use arbor_types::FileMode;

    fn ident(when: i64) -> PersonIdent {
        PersonIdent::new("A U Thor", "author@example.com", when, 0)
    }

    fn commit(odb: &ObjectDatabase, tree: ObjectId, parents: Vec<ObjectId>, msg: &str) -> ObjectId {
        odb.insert_commit(&Commit {
            tree,
            parents,
            author: ident(100),
            committer: ident(100),
            encoding: None,
            extra_headers: Vec::new(),
            message: msg.as_bytes().to_vec(),
        })
        .unwrap()
    }

    #[test]
    fn write_then_open_roundtrip() {
        let odb = ObjectDatabase::in_memory();
        let id = odb.write(ObjectType::Blob, b"content").unwrap();
        let object = odb.open(&id).unwrap();
        assert_eq!(object.data, b"content".to_vec());
        assert_eq!(odb.write(ObjectType::Blob, b"content").unwrap(), id);
    }

    #[test]
    fn open_missing_object() {
        let odb = ObjectDatabase::in_memory();
        let err = odb.open(&ObjectId::from_raw([3; 20])).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn open_typed_enforces_type() {
        let odb = ObjectDatabase::in_memory();
        let blob = odb.insert_blob(b"x").unwrap();
        match odb.open_typed(&blob, ObjectType::Commit).unwrap_err() {
            StoreError::IncorrectType { expected, actual, .. } => {
                assert_eq!(expected, ObjectType::Commit);
                assert_eq!(actual, ObjectType::Blob);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(odb.map_tree(&blob).is_err());
    }

    #[test]
    fn map_commit_rejects_corrupt_bytes() {
        let odb = ObjectDatabase::in_memory();
        let id = odb.write(ObjectType::Commit, b"this is not a commit").unwrap();
        assert!(odb.map_commit(&id).unwrap_err().is_corrupt());
    }

    #[test]
    fn typed_roundtrips() {
        let odb = ObjectDatabase::in_memory();
        let blob = odb.insert_blob(b"data").unwrap();
        let tree = Tree::from_entries(vec![TreeEntry::new(FileMode::REGULAR_FILE, "f", blob)]).unwrap();
        let tree_id = odb.insert_tree(&tree).unwrap();
        assert_eq!(odb.map_tree(&tree_id).unwrap(), tree);

        let c = commit(&odb, tree_id, vec![], "first\n");
        assert_eq!(odb.map_commit(&c).unwrap().short_message(), "first");
        assert_eq!(odb.map_blob(&blob).unwrap().data, b"data".to_vec());
    }

    #[test]
    fn peel_follows_tags() {
        let odb = ObjectDatabase::in_memory();
        let tree = odb.insert_tree(&Tree::new()).unwrap();
        let c = commit(&odb, tree, vec![], "root");
        let tag = odb
            .insert_tag(&Tag {
                object: c,
                target_type: ObjectType::Commit,
                tag_name: "v1".into(),
                tagger: Some(ident(5)),
                extra_headers: Vec::new(),
                message: b"release\n".to_vec(),
            })
            .unwrap();
        let outer = odb
            .insert_tag(&Tag {
                object: tag,
                target_type: ObjectType::Tag,
                tag_name: "v1-signed".into(),
                tagger: None,
                extra_headers: Vec::new(),
                message: Vec::new(),
            })
            .unwrap();

        assert_eq!(odb.peel(&outer).unwrap(), (c, ObjectType::Commit));
        assert_eq!(odb.peel_to(&outer, ObjectType::Tree).unwrap(), tree);
        assert_eq!(odb.peel_to(&outer, ObjectType::Tag).unwrap(), outer);
        assert!(odb.peel_to(&tree, ObjectType::Commit).is_err());
    }
}
