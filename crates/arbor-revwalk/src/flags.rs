//! Per-commit traversal flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit set of walk-scoped commit state.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Headers have been loaded.
    pub const PARSED: Flags = Flags(1 << 0);
    /// The commit has been queued at least once.
    pub const SEEN: Flags = Flags(1 << 1);
    /// The commit and its ancestors are excluded from output.
    pub const UNINTERESTING: Flags = Flags(1 << 2);
    /// Held back by topological ordering until its children are out.
    pub const TOPO_DELAY: Flags = Flags(1 << 3);

    pub(crate) const MERGE_PARENT1: Flags = Flags(1 << 8);
    pub(crate) const MERGE_PARENT2: Flags = Flags(1 << 9);
    pub(crate) const MERGE_STALE: Flags = Flags(1 << 10);
    pub(crate) const MERGE_RESULT: Flags = Flags(1 << 11);

    /// Flags that `RevWalk::reset` clears.
    pub(crate) const TRAVERSAL: Flags = Flags(
        Self::SEEN.0 | Self::UNINTERESTING.0 | Self::TOPO_DELAY.0,
    );
    pub(crate) const MERGE: Flags = Flags(
        Self::MERGE_PARENT1.0 | Self::MERGE_PARENT2.0 | Self::MERGE_STALE.0 | Self::MERGE_RESULT.0,
    );

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any bit of `other` is set.
    pub const fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn intersection(self, other: Flags) -> Flags {
        Flags(self.0 & other.0)
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Flags, &str); 4] = [
            (Flags::PARSED, "PARSED"),
            (Flags::SEEN, "SEEN"),
            (Flags::UNINTERESTING, "UNINTERESTING"),
            (Flags::TOPO_DELAY, "TOPO_DELAY"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Flags({})", names.join(" | "))
    }
}
