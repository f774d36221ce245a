//! Commit filters applied to interesting commits before they are emitted.

use arbor_store::Commit;

/// Decides whether a parsed commit is emitted.
///
/// Rejected commits are still traversed; their parents stay reachable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RevFilter {
    #[default]
    All,
    /// Commits with at most one parent.
    NoMerges,
    /// Commits with two or more parents.
    OnlyMerges,
    /// Committed at or after this epoch second.
    CommitTimeAfter(i64),
    /// Committed at or before this epoch second.
    CommitTimeBefore(i64),
    /// Author name or email contains the text.
    AuthorContains(String),
    /// Message contains the text.
    MessageContains(String),
    /// Every subfilter accepts.
    And(Vec<RevFilter>),
}

impl RevFilter {
    pub fn include(&self, commit: &Commit) -> bool {
        match self {
            RevFilter::All => true,
            RevFilter::NoMerges => !commit.is_merge(),
            RevFilter::OnlyMerges => commit.is_merge(),
            RevFilter::CommitTimeAfter(t) => commit.committer.when >= *t,
            RevFilter::CommitTimeBefore(t) => commit.committer.when <= *t,
            RevFilter::AuthorContains(text) => {
                commit.author.name.contains(text.as_str()) || commit.author.email.contains(text.as_str())
            }
            RevFilter::MessageContains(text) => commit.full_message().contains(text.as_str()),
            RevFilter::And(filters) => filters.iter().all(|f| f.include(commit)),
        }
    }

    /// Combine two filters, flattening nested `And`s and dropping `All`.
    pub fn and(self, other: RevFilter) -> RevFilter {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                RevFilter::All => {}
                RevFilter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => RevFilter::All,
            1 => parts.pop().unwrap_or_default(),
            _ => RevFilter::And(parts),
        }
    }
}
