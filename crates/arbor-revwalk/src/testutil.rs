use arbor_store::{Commit, ObjectDatabase, PersonIdent, Tag, Tree, TreeEntry};
use arbor_types::{FileMode, ObjectId, ObjectType};

/// Builds commit graphs in an in-memory database.
pub(crate) struct Graph {
    pub odb: ObjectDatabase,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            odb: ObjectDatabase::in_memory(),
        }
    }

    /// A commit at time `when` with an empty tree.
    pub fn commit(&self, parents: &[ObjectId], when: i64) -> ObjectId {
        self.commit_with_message(parents, when, &format!("commit at {when}"))
    }

    pub fn commit_with_message(&self, parents: &[ObjectId], when: i64, message: &str) -> ObjectId {
        let tree = self.odb.insert_tree(&Tree::new()).unwrap();
        self.write(tree, parents, when, message)
    }

    /// A commit whose tree holds `files` as `(path, content)` pairs.
    pub fn commit_files(&self, parents: &[ObjectId], when: i64, files: &[(&str, &str)]) -> ObjectId {
        let tree = self.tree(files);
        self.write(tree, parents, when, &format!("commit at {when}"))
    }

    pub fn tag(&self, target: ObjectId, name: &str) -> ObjectId {
        self.odb
            .insert_tag(&Tag {
                object: target,
                target_type: ObjectType::Commit,
                tag_name: name.to_string(),
                tagger: Some(PersonIdent::new("T", "t@example.com", 0, 0)),
                extra_headers: Vec::new(),
                message: Vec::new(),
            })
            .unwrap()
    }

    fn write(&self, tree: ObjectId, parents: &[ObjectId], when: i64, message: &str) -> ObjectId {
        let ident = PersonIdent::new("A U Thor", "author@example.com", when, 0);
        self.odb
            .insert_commit(&Commit {
                tree,
                parents: parents.to_vec(),
                author: ident.clone(),
                committer: ident,
                encoding: None,
                extra_headers: Vec::new(),
                message: message.as_bytes().to_vec(),
            })
            .unwrap()
    }

    fn tree(&self, files: &[(&str, &str)]) -> ObjectId {
        let mut entries = Vec::new();
        let mut dirs: Vec<(&str, Vec<(&str, &str)>)> = Vec::new();
        for &(path, content) in files {
            match path.split_once('/') {
                None => {
                    let blob = self.odb.insert_blob(content.as_bytes()).unwrap();
                    entries.push(TreeEntry::new(FileMode::REGULAR_FILE, path, blob));
                }
                Some((dir, rest)) => match dirs.iter_mut().find(|(d, _)| *d == dir) {
                    Some((_, children)) => children.push((rest, content)),
                    None => dirs.push((dir, vec![(rest, content)])),
                },
            }
        }
        for (dir, children) in dirs {
            entries.push(TreeEntry::new(FileMode::TREE, dir, self.tree(&children)));
        }
        self.odb.insert_tree(&Tree::from_entries(entries).unwrap()).unwrap()
    }
}
