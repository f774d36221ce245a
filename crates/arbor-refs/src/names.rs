//! Ref name validation following git's check-ref-format rules.
//!
//! A valid full ref name:
//! - is `HEAD`, or starts with `refs/`
//! - contains no control characters, space, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - contains neither `..` nor `@{`, and is not the single character `@`
//! - has no empty components and no component starting with `.` or ending
//!   with `.lock`
//! - does not end with `.` or `/`

use crate::error::{RefError, Result};
use crate::types::{HEAD, R_HEADS, R_REFS};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full ref name (`HEAD` or `refs/...`).
///
/// # Examples
///
/// ```
/// use arbor_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/main").is_ok());
/// assert!(validate_ref_name("HEAD").is_ok());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// assert!(validate_ref_name("main").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name == HEAD {
        return Ok(());
    }
    if !name.starts_with(R_REFS) {
        return Err(invalid(name, "must be HEAD or start with 'refs/'"));
    }
    if name == "@" {
        return Err(invalid(name, "must not be '@'"));
    }
    if let Some(c) = name.chars().find(|c| c.is_control() || FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character: {c:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('/') || name.ends_with('.') {
        return Err(invalid(name, "must not end with '/' or '.'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(name, format!("component must not start with '.': {component:?}")));
        }
        if component.ends_with(".lock") {
            return Err(invalid(name, format!("component must not end with '.lock': {component:?}")));
        }
    }
    Ok(())
}

/// Validate a short branch name such as `feature/auth`.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if name.starts_with('-') {
        return Err(invalid(name, "branch name must not start with '-'"));
    }
    validate_ref_name(&format!("{R_HEADS}{name}")).map_err(|e| match e {
        RefError::InvalidName { reason, .. } => invalid(name, reason),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_full_names() {
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("refs/heads/feature/deep/nested").is_ok());
        assert!(validate_ref_name("refs/tags/v1.0").is_ok());
        assert!(validate_ref_name("refs/remotes/origin/HEAD").is_ok());
    }

    #[test]
    fn valid_branch_names() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("user/alice/fix-123").is_ok());
    }

    #[test]
    fn reject_outside_refs() {
        assert!(validate_ref_name("heads/main").is_err());
        assert!(validate_ref_name("").is_err());
    }

    #[test]
    fn reject_double_dot_and_reflog_syntax() {
        assert!(validate_ref_name("refs/heads/a..b").is_err());
        assert!(validate_ref_name("refs/heads/ref@{0}").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for bad in ["a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b", "a b", "a\tb", "a\u{7f}b"] {
            assert!(validate_branch_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn reject_component_rules() {
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("refs/heads/main.lock/x").is_err());
        assert!(validate_ref_name("refs/heads//x").is_err());
        assert!(validate_ref_name("refs/heads/x/").is_err());
        assert!(validate_ref_name("refs/heads/x.").is_err());
    }

    #[test]
    fn branch_errors_report_short_name() {
        match validate_branch_name("bad..name").unwrap_err() {
            RefError::InvalidName { name, .. } => assert_eq!(name, "bad..name"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(validate_branch_name("-flag").is_err());
    }
}
