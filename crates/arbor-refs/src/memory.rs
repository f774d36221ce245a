//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps all refs in a `BTreeMap` protected by a
//! `RwLock`. Each mutation runs under the write lock, so compare-and-swap
//! updates are atomic with respect to other threads.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::{RefStore, MAX_SYMBOLIC_DEPTH};
use crate::types::{Ref, RefUpdate, UpdateOutcome};

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Ref>>> {
        self.refs
            .read()
            .map_err(|e| RefError::Io(std::io::Error::other(format!("lock poisoned: {e}"))))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Ref>>> {
        self.refs
            .write()
            .map_err(|e| RefError::Io(std::io::Error::other(format!("lock poisoned: {e}"))))
    }
}

fn leaf_in(refs: &BTreeMap<String, Ref>, name: &str) -> Result<String> {
    let mut current = name.to_string();
    for _ in 0..=MAX_SYMBOLIC_DEPTH {
        match refs.get(&current) {
            Some(Ref::Symbolic { target, .. }) => current = target.clone(),
            _ => return Ok(current),
        }
    }
    Err(RefError::SymbolicLoop {
        name: name.to_string(),
    })
}

impl RefStore for InMemoryRefStore {
    fn read(&self, name: &str) -> Result<Option<Ref>> {
        Ok(self.read_lock()?.get(name).cloned())
    }

    fn list(&self, prefix: &str) -> Result<Vec<Ref>> {
        let refs = self.read_lock()?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| k.starts_with(crate::types::R_REFS))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn update(&self, update: &RefUpdate) -> Result<UpdateOutcome> {
        validate_ref_name(&update.name)?;
        let mut refs = self.write_lock()?;
        let leaf = leaf_in(&refs, &update.name)?;
        validate_ref_name(&leaf)?;

        let current = refs.get(&leaf).and_then(|r| r.object_id());
        if !update.accepts(current) {
            return Err(RefError::Rejected {
                name: leaf,
                expected: update.expected_old.unwrap_or_else(ObjectId::zero),
                actual: current.unwrap_or_else(ObjectId::zero),
            });
        }
        refs.insert(leaf.clone(), Ref::direct(leaf.clone(), update.new_id));
        debug!(name = %leaf, new = %update.new_id, "ref updated");
        Ok(UpdateOutcome::from_transition(current, update.new_id))
    }

    fn delete(&self, name: &str, expected_old: Option<ObjectId>) -> Result<bool> {
        let mut refs = self.write_lock()?;
        let Some(existing) = refs.get(name) else {
            return Ok(false);
        };
        if let Some(expected) = expected_old {
            let actual = existing.object_id().unwrap_or_else(ObjectId::zero);
            if actual != expected {
                return Err(RefError::Rejected {
                    name: name.to_string(),
                    expected,
                    actual,
                });
            }
        }
        refs.remove(name);
        debug!(name, "ref deleted");
        Ok(true)
    }

    fn link(&self, name: &str, target: &str) -> Result<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let mut refs = self.write_lock()?;
        refs.insert(name.to_string(), Ref::symbolic(name, target));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HEAD;

    fn id(b: u8) -> ObjectId {
        ObjectId::from_raw([b; 20])
    }

    // ---- Reading and writing ----

    #[test]
    fn create_and_read_branch_ref() {
        let store = InMemoryRefStore::new();
        let outcome = store.update(&RefUpdate::new("refs/heads/main", id(10))).unwrap();
        assert_eq!(outcome, UpdateOutcome::Created);

        let read = store.read("refs/heads/main").unwrap().unwrap();
        assert_eq!(read.object_id(), Some(id(10)));
        assert_eq!(read.short_name(), "main");
    }

    #[test]
    fn read_nonexistent_ref_returns_none() {
        let store = InMemoryRefStore::new();
        assert!(store.read("refs/heads/nope").unwrap().is_none());
        assert!(store.resolve("refs/heads/nope").unwrap().is_none());
    }

    #[test]
    fn reject_invalid_name_on_update() {
        let store = InMemoryRefStore::new();
        let err = store.update(&RefUpdate::new("refs/heads/bad..name", id(1))).unwrap_err();
        assert!(matches!(err, RefError::InvalidName { .. }));
    }

    // ---- Compare-and-swap ----

    #[test]
    fn cas_update_succeeds_on_expected_value() {
        let store = InMemoryRefStore::new();
        store.update(&RefUpdate::new("refs/heads/main", id(1))).unwrap();
        let outcome = store
            .update(&RefUpdate::new("refs/heads/main", id(2)).expect(id(1)))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated { old: id(1) });
        assert_eq!(store.resolve("refs/heads/main").unwrap(), Some(id(2)));
    }

    #[test]
    fn cas_update_rejected_on_stale_value() {
        let store = InMemoryRefStore::new();
        store.update(&RefUpdate::new("refs/heads/main", id(1))).unwrap();
        let err = store
            .update(&RefUpdate::new("refs/heads/main", id(3)).expect(id(2)))
            .unwrap_err();
        match err {
            RefError::Rejected { expected, actual, .. } => {
                assert_eq!(expected, id(2));
                assert_eq!(actual, id(1));
            }
            other => panic!("expected Rejected, got {other}"),
        }
        assert_eq!(store.resolve("refs/heads/main").unwrap(), Some(id(1)));
    }

    #[test]
    fn create_only_update_rejects_existing_ref() {
        let store = InMemoryRefStore::new();
        let create = RefUpdate::new("refs/tags/v1", id(1)).expect(ObjectId::zero());
        store.update(&create).unwrap();
        assert!(matches!(store.update(&create), Err(RefError::Rejected { .. })));
    }

    #[test]
    fn same_value_is_no_change() {
        let store = InMemoryRefStore::new();
        store.update(&RefUpdate::new("refs/heads/main", id(1))).unwrap();
        let outcome = store.update(&RefUpdate::new("refs/heads/main", id(1))).unwrap();
        assert_eq!(outcome, UpdateOutcome::NoChange);
    }

    // ---- Symbolic refs ----

    #[test]
    fn update_through_head_moves_branch() {
        let store = InMemoryRefStore::new();
        store.link(HEAD, "refs/heads/main").unwrap();
        assert!(store.resolve(HEAD).unwrap().is_none());

        store.update(&RefUpdate::new(HEAD, id(7))).unwrap();
        assert_eq!(store.resolve(HEAD).unwrap(), Some(id(7)));
        assert_eq!(store.resolve("refs/heads/main").unwrap(), Some(id(7)));
        assert!(store.head().unwrap().unwrap().is_symbolic());
    }

    #[test]
    fn symbolic_cycle_is_detected() {
        let store = InMemoryRefStore::new();
        store.link("refs/heads/a", "refs/heads/b").unwrap();
        store.link("refs/heads/b", "refs/heads/a").unwrap();
        assert!(matches!(store.resolve("refs/heads/a"), Err(RefError::SymbolicLoop { .. })));
    }

    // ---- Deletion and listing ----

    #[test]
    fn delete_checks_expected_value() {
        let store = InMemoryRefStore::new();
        store.update(&RefUpdate::new("refs/heads/feature", id(4))).unwrap();
        assert!(store.delete("refs/heads/feature", Some(id(5))).is_err());
        assert!(store.delete("refs/heads/feature", Some(id(4))).unwrap());
        assert!(!store.delete("refs/heads/feature", None).unwrap());
    }

    #[test]
    fn list_filters_by_prefix_and_sorts() {
        let store = InMemoryRefStore::new();
        store.link(HEAD, "refs/heads/main").unwrap();
        for name in ["refs/heads/main", "refs/heads/develop", "refs/tags/v1.0.0"] {
            store.update(&RefUpdate::new(name, id(1))).unwrap();
        }
        let branches: Vec<String> = store.branches().unwrap().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(branches, vec!["refs/heads/develop", "refs/heads/main"]);
        assert_eq!(store.tags().unwrap().len(), 1);
        assert_eq!(store.list("").unwrap().len(), 3);
    }
}
