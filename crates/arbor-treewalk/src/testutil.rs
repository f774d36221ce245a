use arbor_store::{ObjectDatabase, Tree, TreeEntry};
use arbor_types::{FileMode, ObjectId};

pub(crate) fn blob(odb: &ObjectDatabase, data: &str) -> ObjectId {
    odb.insert_blob(data.as_bytes()).unwrap()
}

/// Build a tree from `(path, content)` pairs, creating subtrees as needed.
pub(crate) fn build(odb: &ObjectDatabase, files: &[(&str, &str)]) -> ObjectId {
    let mut entries = Vec::new();
    let mut dirs: Vec<(&str, Vec<(&str, &str)>)> = Vec::new();
    for &(path, content) in files {
        match path.split_once('/') {
            None => entries.push(TreeEntry::new(FileMode::REGULAR_FILE, path, blob(odb, content))),
            Some((dir, rest)) => match dirs.iter_mut().find(|(d, _)| *d == dir) {
                Some((_, children)) => children.push((rest, content)),
                None => dirs.push((dir, vec![(rest, content)])),
            },
        }
    }
    for (dir, children) in dirs {
        entries.push(TreeEntry::new(FileMode::TREE, dir, build(odb, &children)));
    }
    odb.insert_tree(&Tree::from_entries(entries).unwrap()).unwrap()
}
