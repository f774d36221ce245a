//! Core reference types.
//!
//! A [`Ref`] is a named pointer into the object graph. Updates are described
//! by a [`RefUpdate`] so that every store applies the same compare-and-swap
//! rule.

use arbor_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Name of the symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";
/// Prefix of every ref below the refs directory.
pub const R_REFS: &str = "refs/";
/// Prefix of local branches.
pub const R_HEADS: &str = "refs/heads/";
/// Prefix of tags.
pub const R_TAGS: &str = "refs/tags/";
/// Prefix of remote-tracking branches.
pub const R_REMOTES: &str = "refs/remotes/";

/// A named reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Ref {
    /// Points directly at an object.
    Direct {
        /// Full ref name (e.g. "refs/heads/main").
        name: String,
        /// Object the ref points at.
        target: ObjectId,
    },

    /// Points at another ref by name.
    Symbolic {
        /// Full ref name (e.g. "HEAD").
        name: String,
        /// Full name of the target ref.
        target: String,
    },
}

impl Ref {
    /// Create a direct ref.
    pub fn direct(name: impl Into<String>, target: ObjectId) -> Self {
        Ref::Direct {
            name: name.into(),
            target,
        }
    }

    /// Create a symbolic ref.
    pub fn symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Ref::Symbolic {
            name: name.into(),
            target: target.into(),
        }
    }

    /// Full name of this ref.
    pub fn name(&self) -> &str {
        match self {
            Ref::Direct { name, .. } | Ref::Symbolic { name, .. } => name,
        }
    }

    /// Name with the well-known prefix removed ("refs/heads/main" -> "main").
    pub fn short_name(&self) -> &str {
        let name = self.name();
        [R_HEADS, R_TAGS, R_REMOTES, R_REFS]
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
            .unwrap_or(name)
    }

    /// The object id, for direct refs.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct { target, .. } => Some(*target),
            Ref::Symbolic { .. } => None,
        }
    }

    /// The target ref name, for symbolic refs.
    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            Ref::Symbolic { target, .. } => Some(target),
            Ref::Direct { .. } => None,
        }
    }

    /// Returns `true` if this is a symbolic ref.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic { .. })
    }
}

/// A compare-and-swap request against one ref.
///
/// `expected_old` selects the precondition:
/// - `None`: no check, the ref is overwritten unconditionally.
/// - `Some(zero)`: the ref must not exist yet.
/// - `Some(id)`: the ref must currently point at `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefUpdate {
    /// Ref to update. Symbolic refs are followed to their target.
    pub name: String,
    /// New value.
    pub new_id: ObjectId,
    /// Required current value, if any.
    pub expected_old: Option<ObjectId>,
}

impl RefUpdate {
    /// Update `name` to `new_id` without a precondition.
    pub fn new(name: impl Into<String>, new_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            new_id,
            expected_old: None,
        }
    }

    /// Require the ref to hold `old` (zero = absent) when the update applies.
    pub fn expect(mut self, old: ObjectId) -> Self {
        self.expected_old = Some(old);
        self
    }

    /// Check the precondition against the current value.
    pub fn accepts(&self, current: Option<ObjectId>) -> bool {
        match self.expected_old {
            None => true,
            Some(expected) => expected == current.unwrap_or_else(ObjectId::zero),
        }
    }
}

/// Result of a successful ref update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The ref did not exist before.
    Created,
    /// The ref moved from `old`.
    Updated { old: ObjectId },
    /// The ref already pointed at the new value.
    NoChange,
}

impl UpdateOutcome {
    pub(crate) fn from_transition(old: Option<ObjectId>, new: ObjectId) -> Self {
        match old {
            None => UpdateOutcome::Created,
            Some(old) if old == new => UpdateOutcome::NoChange,
            Some(old) => UpdateOutcome::Updated { old },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> ObjectId {
        ObjectId::from_raw([b; 20])
    }

    #[test]
    fn short_names_strip_known_prefixes() {
        assert_eq!(Ref::direct("refs/heads/main", id(1)).short_name(), "main");
        assert_eq!(Ref::direct("refs/tags/v1", id(1)).short_name(), "v1");
        assert_eq!(
            Ref::direct("refs/remotes/origin/main", id(1)).short_name(),
            "origin/main"
        );
        assert_eq!(Ref::symbolic(HEAD, "refs/heads/main").short_name(), "HEAD");
    }

    #[test]
    fn update_preconditions() {
        let unconditional = RefUpdate::new("refs/heads/main", id(2));
        assert!(unconditional.accepts(None));
        assert!(unconditional.accepts(Some(id(9))));

        let create_only = RefUpdate::new("refs/heads/main", id(2)).expect(ObjectId::zero());
        assert!(create_only.accepts(None));
        assert!(!create_only.accepts(Some(id(1))));

        let cas = RefUpdate::new("refs/heads/main", id(2)).expect(id(1));
        assert!(cas.accepts(Some(id(1))));
        assert!(!cas.accepts(Some(id(3))));
        assert!(!cas.accepts(None));
    }

    #[test]
    fn outcome_from_transition() {
        assert_eq!(UpdateOutcome::from_transition(None, id(1)), UpdateOutcome::Created);
        assert_eq!(UpdateOutcome::from_transition(Some(id(1)), id(1)), UpdateOutcome::NoChange);
        assert_eq!(
            UpdateOutcome::from_transition(Some(id(1)), id(2)),
            UpdateOutcome::Updated { old: id(1) }
        );
    }

    #[test]
    fn serde_is_tagged() {
        let r = Ref::symbolic(HEAD, "refs/heads/main");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"kind\":\"symbolic\""));
        let back: Ref = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
