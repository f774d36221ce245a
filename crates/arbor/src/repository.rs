use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_index::{Checkout, CheckoutPlan, DirCache};
use arbor_refs::{FileRefStore, RefStore, RefUpdate, HEAD, R_HEADS};
use arbor_revwalk::{RevFilter, RevSort, RevWalk};
use arbor_store::{Commit, LooseObjectStore, ObjectDatabase, PersonIdent};
use arbor_treewalk::{diff_trees, DiffEntry, PathFilterGroup, TreeFilter, TreeWalk};
use arbor_types::{ObjectId, ObjectType};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// Branch HEAD points at in a new repository.
pub const DEFAULT_BRANCH: &str = "main";

/// An opened git directory.
pub struct Repository {
    git_dir: PathBuf,
    work_dir: Option<PathBuf>,
    config: RepositoryConfig,
    odb: ObjectDatabase,
}

/// Options for [`Repository::log`].
#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    /// Orderings; empty means the configured default.
    pub sort: Vec<RevSort>,
    pub max_count: Option<usize>,
    pub no_merges: bool,
    /// Limit history to commits touching these paths.
    pub paths: Vec<String>,
}

/// One commit of a log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: ObjectId,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: PersonIdent,
    pub committer: PersonIdent,
    pub summary: String,
    pub message: String,
}

impl Repository {
    /// Create a repository with a working tree at `path`, storing its data
    /// in `path/.git`.
    pub fn init(path: impl AsRef<Path>) -> RepoResult<Self> {
        let work_dir = path.as_ref().to_path_buf();
        Self::init_at(work_dir.join(".git"), Some(work_dir), false)
    }

    /// Create a bare repository whose git directory is `path`.
    pub fn init_bare(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::init_at(path.as_ref().to_path_buf(), None, true)
    }

    fn init_at(git_dir: PathBuf, work_dir: Option<PathBuf>, bare: bool) -> RepoResult<Self> {
        if git_dir.join(HEAD).exists() {
            return Err(RepoError::AlreadyExists(git_dir));
        }
        for dir in ["objects", "refs/heads", "refs/tags"] {
            fs::create_dir_all(git_dir.join(dir))?;
        }
        let mut config = RepositoryConfig::default();
        config.core.bare = bare;
        config.save(&git_dir)?;

        let repo = Self::from_parts(git_dir, work_dir, config);
        repo.odb
            .refs()
            .link(HEAD, &format!("{R_HEADS}{DEFAULT_BRANCH}"))?;
        info!(git_dir = %repo.git_dir.display(), bare, "initialized repository");
        Ok(repo)
    }

    /// Open the repository at `path`: either a working tree containing
    /// `.git`, or a git directory itself.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let dotgit = path.join(".git");
        let (git_dir, work_dir) = if is_git_dir(&dotgit) {
            (dotgit, Some(path.to_path_buf()))
        } else if is_git_dir(path) {
            (path.to_path_buf(), None)
        } else {
            return Err(RepoError::NotARepository(path.to_path_buf()));
        };
        let config = RepositoryConfig::load(&git_dir)?;
        let work_dir = if config.core.bare { None } else { work_dir };
        debug!(git_dir = %git_dir.display(), "opened repository");
        Ok(Self::from_parts(git_dir, work_dir, config))
    }

    fn from_parts(git_dir: PathBuf, work_dir: Option<PathBuf>, config: RepositoryConfig) -> Self {
        let objects = LooseObjectStore::new(git_dir.join("objects"))
            .with_compression_level(config.core.compression_level)
            .with_verify_on_read(config.core.verify_on_read);
        let refs = FileRefStore::new(&git_dir);
        let odb = ObjectDatabase::new(Arc::new(objects), Arc::new(refs));
        Self {
            git_dir,
            work_dir,
            config,
            odb,
        }
    }

    // ---- Accessors ----

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The working tree, or `None` for a bare repository.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn object_database(&self) -> &ObjectDatabase {
        &self.odb
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.odb.refs()
    }

    /// A revision walk using the configured default ordering.
    pub fn rev_walk(&self) -> RevWalk {
        let mut walk = RevWalk::new(&self.odb);
        apply_sort(&mut walk, &self.config.walk.default_sort);
        walk
    }

    pub fn tree_walk(&self) -> TreeWalk {
        TreeWalk::new(&self.odb)
    }

    // ---- Index ----

    pub fn index_path(&self) -> PathBuf {
        self.git_dir.join(&self.config.index.path)
    }

    pub fn read_index(&self) -> RepoResult<DirCache> {
        Ok(DirCache::read(&self.index_path())?)
    }

    pub fn write_index(&self, index: &DirCache) -> RepoResult<()> {
        Ok(index.write(&self.index_path())?)
    }

    /// Move the index from HEAD's tree to the tree of `rev`.
    ///
    /// Refuses with a checkout conflict if an affected path has staged
    /// changes. Only the index is written; HEAD does not move.
    pub fn checkout_index(&self, rev: &str) -> RepoResult<CheckoutPlan> {
        let target = self.odb.peel_to(&self.resolve(rev)?, ObjectType::Tree)?;
        let head = match self.head()? {
            Some(id) => Some(self.odb.peel_to(&id, ObjectType::Tree)?),
            None => None,
        };
        let index = self.read_index()?;
        let plan = Checkout::plan(&self.odb, &index, head, target)?;
        self.write_index(&plan.apply(&index)?)?;
        Ok(plan)
    }

    // ---- Revisions ----

    /// Resolve a revision expression; unknown names are an error.
    pub fn resolve(&self, expr: &str) -> RepoResult<ObjectId> {
        self.odb
            .resolve(expr)?
            .ok_or_else(|| RepoError::UnknownRevision(expr.to_string()))
    }

    /// The commit HEAD points at, or `None` on an unborn branch.
    pub fn head(&self) -> RepoResult<Option<ObjectId>> {
        Ok(self.odb.refs().resolve(HEAD)?)
    }

    /// List commits reachable from `revs`.
    ///
    /// Each revision is `A` (include), `^A` (exclude), or `A..B` (reachable
    /// from `B` but not `A`; either side defaults to HEAD). An empty list
    /// means HEAD.
    pub fn log<S: AsRef<str>>(&self, revs: &[S], options: &LogOptions) -> RepoResult<Vec<LogEntry>> {
        let mut walk = self.rev_walk();
        if !options.sort.is_empty() {
            apply_sort(&mut walk, &options.sort);
        }
        walk.set_max_count(options.max_count);
        if options.no_merges {
            walk.set_rev_filter(RevFilter::NoMerges);
        }
        if !options.paths.is_empty() {
            walk.set_tree_filter(PathFilterGroup::create(&options.paths)?);
        }

        if revs.is_empty() {
            self.mark(&mut walk, HEAD, false)?;
        }
        for rev in revs {
            let rev = rev.as_ref();
            if rev.contains("...") {
                return Err(RepoError::InvalidOperation(format!(
                    "symmetric ranges are not supported: {rev}"
                )));
            }
            if let Some((from, to)) = rev.split_once("..") {
                self.mark(&mut walk, or_head(from), true)?;
                self.mark(&mut walk, or_head(to), false)?;
            } else if let Some(excluded) = rev.strip_prefix('^') {
                self.mark(&mut walk, excluded, true)?;
            } else {
                self.mark(&mut walk, rev, false)?;
            }
        }

        let mut entries = Vec::new();
        while let Some(rc) = walk.next_commit()? {
            let commit = walk
                .commit(rc)
                .ok_or_else(|| RepoError::InvalidOperation(format!("commit {} was not parsed", rc.id())))?;
            entries.push(LogEntry {
                id: rc.id(),
                tree: commit.tree,
                parents: commit.parents.clone(),
                author: commit.author.clone(),
                committer: commit.committer.clone(),
                summary: commit.short_message(),
                message: commit.full_message(),
            });
        }
        debug!(commits = entries.len(), "log complete");
        Ok(entries)
    }

    fn mark(&self, walk: &mut RevWalk, expr: &str, uninteresting: bool) -> RepoResult<()> {
        let commit = walk.parse_commit(self.resolve(expr)?)?;
        if uninteresting {
            walk.mark_uninteresting(commit)?;
        } else {
            walk.mark_start(commit)?;
        }
        Ok(())
    }

    /// Compare the trees of two revisions. `old = None` compares against
    /// an empty tree. `paths` restricts the comparison when non-empty.
    pub fn diff(&self, old: Option<&str>, new: &str, paths: &[String]) -> RepoResult<Vec<DiffEntry>> {
        let old = match old {
            Some(expr) => Some(self.odb.peel_to(&self.resolve(expr)?, ObjectType::Tree)?),
            None => None,
        };
        let new = self.odb.peel_to(&self.resolve(new)?, ObjectType::Tree)?;
        let filter: Option<Box<dyn TreeFilter>> = if paths.is_empty() {
            None
        } else {
            Some(Box::new(PathFilterGroup::create(paths)?))
        };
        Ok(diff_trees(&self.odb, old, Some(new), filter)?)
    }

    // ---- Writing ----

    /// Write a commit and, if `update_ref` is given, move that ref to it.
    ///
    /// The ref moves only if it still holds the first parent (or does not
    /// exist, for a root commit), so a concurrent update is rejected rather
    /// than lost.
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        author: PersonIdent,
        committer: PersonIdent,
        message: &str,
        update_ref: Option<&str>,
    ) -> RepoResult<ObjectId> {
        self.odb.open_typed(&tree, ObjectType::Tree)?;
        for parent in parents {
            self.odb.open_typed(parent, ObjectType::Commit)?;
        }
        let commit = Commit {
            tree,
            parents: parents.to_vec(),
            author,
            committer,
            encoding: None,
            extra_headers: Vec::new(),
            message: message.as_bytes().to_vec(),
        };
        let id = self.odb.insert_commit(&commit)?;

        if let Some(name) = update_ref {
            let expected = parents.first().copied().unwrap_or_else(ObjectId::zero);
            let outcome = self.odb.refs().update(&RefUpdate::new(name, id).expect(expected))?;
            debug!(%id, name, ?outcome, "ref moved to new commit");
        }
        Ok(id)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

fn is_git_dir(path: &Path) -> bool {
    path.join(HEAD).is_file() && path.join("objects").is_dir()
}

fn or_head(rev: &str) -> &str {
    if rev.is_empty() {
        HEAD
    } else {
        rev
    }
}

fn apply_sort(walk: &mut RevWalk, sorts: &[RevSort]) {
    walk.set_sort(RevSort::None);
    for &sort in sorts {
        walk.add_sort(sort);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_index::{DirCacheBuilder, DirCacheEntry};
    use arbor_types::FileMode;

    fn ident(when: i64) -> PersonIdent {
        PersonIdent::new("A U Thor", "author@example.com", when, 60)
    }

    fn tree(repo: &Repository, files: &[(&str, &str)]) -> ObjectId {
        let odb = repo.object_database();
        let mut builder = DirCacheBuilder::new();
        for &(path, content) in files {
            let id = odb.insert_blob(content.as_bytes()).unwrap();
            builder.add(DirCacheEntry::with_object(path, FileMode::REGULAR_FILE, id).unwrap());
        }
        builder.finish().unwrap().write_tree(odb).unwrap()
    }

    fn commit(repo: &Repository, files: &[(&str, &str)], when: i64, msg: &str) -> ObjectId {
        let parents: Vec<ObjectId> = repo.head().unwrap().into_iter().collect();
        let tree = tree(repo, files);
        repo.commit_tree(tree, &parents, ident(when), ident(when), msg, Some(HEAD))
            .unwrap()
    }

    fn ids(entries: &[LogEntry]) -> Vec<ObjectId> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let git = dir.path().join(".git");
        assert!(git.join("objects").is_dir());
        assert!(git.join("refs/heads").is_dir());
        assert!(git.join("refs/tags").is_dir());
        assert_eq!(fs::read_to_string(git.join("HEAD")).unwrap().trim(), "ref: refs/heads/main");
        assert_eq!(repo.work_dir(), Some(dir.path()));
        assert!(repo.head().unwrap().is_none());

        assert!(matches!(Repository::init(dir.path()), Err(RepoError::AlreadyExists(_))));
    }

    #[test]
    fn open_finds_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let from_work_tree = Repository::open(dir.path()).unwrap();
        let from_git_dir = Repository::open(dir.path().join(".git")).unwrap();
        assert_eq!(from_work_tree.git_dir(), from_git_dir.git_dir());

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(Repository::open(empty.path()), Err(RepoError::NotARepository(_))));
    }

    #[test]
    fn bare_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        assert!(repo.config().core.bare);
        assert!(repo.work_dir().is_none());
    }

    #[test]
    fn commit_tree_moves_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, &[("a", "1")], 100, "first");
        assert_eq!(repo.head().unwrap(), Some(first));
        assert_eq!(repo.resolve("main").unwrap(), first);

        let second = commit(&repo, &[("a", "2")], 200, "second");
        assert_eq!(repo.resolve("HEAD~1").unwrap(), first);
        assert_eq!(repo.head().unwrap(), Some(second));

        // A writer holding a stale parent is rejected.
        let t = tree(&repo, &[("a", "3")]);
        let stale = repo.commit_tree(t, &[first], ident(300), ident(300), "stale", Some(HEAD));
        assert!(matches!(stale, Err(RepoError::Ref(_))));
        assert_eq!(repo.head().unwrap(), Some(second));
    }

    #[test]
    fn commit_tree_checks_object_types() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let blob = repo.object_database().insert_blob(b"x").unwrap();
        let result = repo.commit_tree(blob, &[], ident(1), ident(1), "bad", None);
        assert!(matches!(result, Err(RepoError::Store(_))));
    }

    #[test]
    fn log_ranges_and_options() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let c1 = commit(&repo, &[("a", "1")], 100, "one");
        let c2 = commit(&repo, &[("a", "1"), ("b", "1")], 200, "two");
        let c3 = commit(&repo, &[("a", "2"), ("b", "1")], 300, "three\n\nbody");

        let all = repo.log::<&str>(&[], &LogOptions::default()).unwrap();
        assert_eq!(ids(&all), vec![c3, c2, c1]);
        assert_eq!(all[0].summary, "three");
        assert_eq!(all[0].parents, vec![c2]);

        let range = repo.log(&[format!("{c1}..")], &LogOptions::default()).unwrap();
        assert_eq!(ids(&range), vec![c3, c2]);

        let excluded = repo.log(&["HEAD", "^HEAD~1"], &LogOptions::default()).unwrap();
        assert_eq!(ids(&excluded), vec![c3]);

        let reversed = LogOptions {
            sort: vec![RevSort::Reverse],
            max_count: Some(2),
            ..LogOptions::default()
        };
        assert_eq!(ids(&repo.log(&["HEAD"], &reversed).unwrap()), vec![c2, c3]);

        let touching_a = LogOptions {
            paths: vec!["a".into()],
            ..LogOptions::default()
        };
        assert_eq!(ids(&repo.log(&["HEAD"], &touching_a).unwrap()), vec![c3, c1]);

        assert!(matches!(
            repo.log(&["a...b"], &LogOptions::default()),
            Err(RepoError::InvalidOperation(_))
        ));
        assert!(matches!(
            repo.log(&["nope"], &LogOptions::default()),
            Err(RepoError::UnknownRevision(_))
        ));
    }

    #[test]
    fn configured_default_sort_applies() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let git_dir = dir.path().join(".git");
        let mut config = RepositoryConfig::load(&git_dir).unwrap();
        config.walk.default_sort = vec![RevSort::Reverse];
        config.save(&git_dir).unwrap();

        let repo = Repository::open(dir.path()).unwrap();
        let c1 = commit(&repo, &[("a", "1")], 100, "one");
        let c2 = commit(&repo, &[("a", "2")], 200, "two");
        assert_eq!(ids(&repo.log::<&str>(&[], &LogOptions::default()).unwrap()), vec![c1, c2]);
    }

    #[test]
    fn diff_between_revisions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("a", "1"), ("d/b", "1")], 100, "one");
        commit(&repo, &[("a", "2"), ("d/b", "1"), ("d/c", "1")], 200, "two");

        let changes = repo.diff(Some("HEAD~1"), "HEAD", &[]).unwrap();
        let summary: Vec<(char, &str)> = changes.iter().map(|c| (c.status(), c.path())).collect();
        assert_eq!(summary, vec![('M', "a"), ('A', "d/c")]);

        let limited = repo.diff(Some("HEAD~1"), "HEAD", &["d".to_string()]).unwrap();
        assert_eq!(limited.len(), 1);

        let initial = repo.diff(None, "HEAD~1", &[]).unwrap();
        assert_eq!(initial.len(), 2);
    }

    #[test]
    fn index_round_trip_and_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(repo.read_index().unwrap().is_empty());

        let c1 = commit(&repo, &[("a", "1")], 100, "one");
        commit(&repo, &[("a", "2"), ("b", "1")], 200, "two");
        let head_tree = repo.object_database().map_commit(&repo.head().unwrap().unwrap()).unwrap().tree;
        let index = DirCache::read_tree(repo.object_database(), head_tree).unwrap();
        repo.write_index(&index).unwrap();
        assert_eq!(repo.read_index().unwrap(), index);

        let plan = repo.checkout_index(&c1.to_hex()).unwrap();
        assert_eq!(plan.removals, vec!["b"]);
        assert_eq!(plan.updates.len(), 1);
        let after = repo.read_index().unwrap();
        assert_eq!(after.write_tree(repo.object_database()).unwrap(), repo.odb.map_commit(&c1).unwrap().tree);
    }

    #[test]
    fn log_entries_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let id = commit(&repo, &[("a", "1")], 100, "hello");
        let log = repo.log::<&str>(&[], &LogOptions::default()).unwrap();
        let json = serde_json::to_value(&log[0]).unwrap();
        assert_eq!(json["id"], id.to_hex());
        assert_eq!(json["summary"], "hello");
        assert_eq!(json["author"]["name"], "A U Thor");
    }
}
