//! Tree path utilities.
//!
//! Paths address nodes in an arbor tree. Tree children are introduced by `/`
//! and embedded fields by `.`, so a path always starts at a root node:
//!
//! ```
//! use arbor_path::{format_path, parse_path, PathStep};
//!
//! let path = parse_path("/root/panel.style").unwrap();
//! assert_eq!(
//!     path,
//!     vec![
//!         PathStep::Child("root".to_string()),
//!         PathStep::Child("panel".to_string()),
//!         PathStep::Field("style".to_string()),
//!     ]
//! );
//! assert_eq!(format_path(&path), "/root/panel.style");
//! ```
//!
//! Node names never contain separators; [`sanitize_name`] replaces them so
//! that a formatted path always parses back to the same steps.

use std::borrow::Cow;
use thiserror::Error;

pub mod types;
pub use types::{Path, PathStep, CHILD_SEPARATOR, FIELD_SEPARATOR};

pub mod validate;
pub use validate::{validate_path, validate_steps, MAX_PATH_DEPTH, MAX_PATH_LENGTH};

/// Errors produced by path operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path must start with '/': {0:?}")]
    NotAbsolute(String),
    #[error("path has no parent: {0:?}")]
    NoParent(String),
    #[error("path too long: {0} bytes")]
    TooLong(usize),
    #[error("path too deep: {0} steps")]
    TooDeep(usize),
}

fn is_separator(c: char) -> bool {
    c == CHILD_SEPARATOR || c == FIELD_SEPARATOR
}

/// Replace path separators in a node name with `_`.
///
/// # Example
///
/// ```
/// use arbor_path::sanitize_name;
///
/// assert_eq!(sanitize_name("a.b/c"), "a_b_c");
/// assert_eq!(sanitize_name("plain"), "plain");
/// ```
pub fn sanitize_name(name: &str) -> Cow<'_, str> {
    if !name.contains(is_separator) {
        return Cow::Borrowed(name);
    }
    Cow::Owned(name.replace(is_separator, "_"))
}

/// Parse a path string into steps.
///
/// The empty string is the empty path. Any other path must begin with `/`.
///
/// # Example
///
/// ```
/// use arbor_path::{parse_path, PathStep};
///
/// assert_eq!(parse_path("").unwrap(), vec![]);
/// assert_eq!(parse_path("/a.f").unwrap(), vec![
///     PathStep::Child("a".to_string()),
///     PathStep::Field("f".to_string()),
/// ]);
/// assert!(parse_path("a").is_err());
/// ```
pub fn parse_path(path: &str) -> Result<Path, PathError> {
    validate_path(path)?;
    let mut steps = Vec::new();
    let mut current: Option<PathStep> = None;
    for c in path.chars() {
        if is_separator(c) {
            if let Some(step) = current.take() {
                steps.push(step);
            }
            current = Some(if c == CHILD_SEPARATOR {
                PathStep::Child(String::new())
            } else {
                PathStep::Field(String::new())
            });
            continue;
        }
        match current.as_mut() {
            Some(PathStep::Child(name)) | Some(PathStep::Field(name)) => name.push(c),
            // validate_path guarantees a leading separator
            None => return Err(PathError::NotAbsolute(path.to_string())),
        }
    }
    if let Some(step) = current {
        steps.push(step);
    }
    validate_steps(&steps)?;
    Ok(steps)
}

/// Format steps into a path string.
///
/// # Example
///
/// ```
/// use arbor_path::{format_path, PathStep};
///
/// assert_eq!(format_path(&[]), "");
/// assert_eq!(format_path(&[PathStep::Child("a".to_string())]), "/a");
/// ```
pub fn format_path(steps: &[PathStep]) -> String {
    let mut out = String::with_capacity(steps.iter().map(|s| s.name().len() + 1).sum());
    for step in steps {
        out.push(step.separator());
        out.push_str(step.name());
    }
    out
}

/// Append a single step to a path string.
pub fn join(path: &str, step: &PathStep) -> String {
    let mut out = String::with_capacity(path.len() + step.name().len() + 1);
    out.push_str(path);
    out.push(step.separator());
    out.push_str(step.name());
    out
}

/// Returns `true` if `prefix` addresses `path` or one of its ancestors.
///
/// Matching respects step boundaries: `/a/b` is not a prefix of `/a/bc`.
///
/// # Example
///
/// ```
/// use arbor_path::is_prefix;
///
/// assert!(is_prefix("/a/b", "/a/b/c"));
/// assert!(is_prefix("/a/b", "/a/b.f"));
/// assert!(is_prefix("/a/b", "/a/b"));
/// assert!(!is_prefix("/a/b", "/a/bc"));
/// ```
pub fn is_prefix(prefix: &str, path: &str) -> bool {
    strip_prefix(path, prefix).is_some()
}

/// Strip `prefix` from `path` on a step boundary, returning the remainder.
///
/// The remainder is either empty or starts with a separator.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if is_separator(c) => Some(rest),
        Some(_) => None,
    }
}

/// Rewrite `path` so that the `old` prefix is replaced by `new`.
///
/// Returns `None` when `path` does not live under `old`.
///
/// # Example
///
/// ```
/// use arbor_path::rebase;
///
/// assert_eq!(rebase("/a/b/c", "/a/b", "/x"), Some("/x/c".to_string()));
/// assert_eq!(rebase("/a/b", "/a/b", "/x"), Some("/x".to_string()));
/// assert_eq!(rebase("/a/bc", "/a/b", "/x"), None);
/// ```
pub fn rebase(path: &str, old: &str, new: &str) -> Option<String> {
    let rest = strip_prefix(path, old)?;
    let mut out = String::with_capacity(new.len() + rest.len());
    out.push_str(new);
    out.push_str(rest);
    Some(out)
}

/// Returns the path of the parent of `path`.
///
/// # Errors
///
/// Returns [`PathError::NoParent`] for the empty path.
///
/// # Example
///
/// ```
/// use arbor_path::parent;
///
/// assert_eq!(parent("/a/b.f").unwrap(), "/a/b");
/// assert_eq!(parent("/a").unwrap(), "");
/// assert!(parent("").is_err());
/// ```
pub fn parent(path: &str) -> Result<String, PathError> {
    match path.rfind(is_separator) {
        Some(idx) => Ok(path[..idx].to_string()),
        None => Err(PathError::NoParent(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> PathStep {
        PathStep::Child(name.to_string())
    }

    fn field(name: &str) -> PathStep {
        PathStep::Field(name.to_string())
    }

    #[test]
    fn test_sanitize_borrowed_when_clean() {
        assert!(matches!(sanitize_name("abc"), Cow::Borrowed("abc")));
        assert_eq!(sanitize_name("a.b"), "a_b");
        assert_eq!(sanitize_name("/"), "_");
    }

    #[test]
    fn test_parse_root_only() {
        assert_eq!(parse_path("/root").unwrap(), vec![child("root")]);
        assert_eq!(parse_path("/").unwrap(), vec![child("")]);
    }

    #[test]
    fn test_parse_mixed_steps() {
        assert_eq!(
            parse_path("/r/a.f/b").unwrap(),
            vec![child("r"), child("a"), field("f"), child("b")]
        );
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert_eq!(
            parse_path("r/a"),
            Err(PathError::NotAbsolute("r/a".to_string()))
        );
    }

    #[test]
    fn test_format_roundtrip() {
        for p in ["", "/r", "/r/a", "/r/a.f", "/r/a.f/b.g.h"] {
            assert_eq!(format_path(&parse_path(p).unwrap()), p);
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/r", &child("a")), "/r/a");
        assert_eq!(join("/r/a", &field("f")), "/r/a.f");
        assert_eq!(join("", &child("r")), "/r");
    }

    #[test]
    fn test_strip_prefix_boundaries() {
        assert_eq!(strip_prefix("/a/b/c", "/a/b"), Some("/c"));
        assert_eq!(strip_prefix("/a/b.f", "/a/b"), Some(".f"));
        assert_eq!(strip_prefix("/a/b", "/a/b"), Some(""));
        assert_eq!(strip_prefix("/a/bc", "/a/b"), None);
        assert_eq!(strip_prefix("/x", "/a"), None);
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("/a/b.f/c", "/a/b", "/z/y"), Some("/z/y.f/c".to_string()));
        assert_eq!(rebase("/q", "/a", "/z"), None);
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/a/b/c").unwrap(), "/a/b");
        assert_eq!(parent("/a").unwrap(), "");
        assert_eq!(parent(""), Err(PathError::NoParent(String::new())));
    }
}
