//! Slash-path canonicalization and filesystem conversion.

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

static SLASHES_REGEX: OnceLock<Regex> = OnceLock::new();

fn slashes_regex() -> &'static Regex {
    SLASHES_REGEX.get_or_init(|| Regex::new(r"/+").unwrap())
}

/// Canonicalize a logical slash path.
///
/// Runs of `/` collapse to one, leading and trailing slashes are stripped,
/// and the result is re-prefixed with a single `/`.  Idempotent: applying
/// it twice yields the same string.
///
/// # Examples
///
/// ```
/// use loam_db::path::canonicalize;
///
/// assert_eq!(canonicalize("blog//post-1/"), "/blog/post-1");
/// assert_eq!(canonicalize(""), "/");
/// assert_eq!(canonicalize("/"), "/");
/// ```
pub fn canonicalize(path: &str) -> String {
    format!("/{}", slashes_regex().replace_all(path.trim_matches('/'), "/"))
}

/// Convert a logical path into a relative filesystem path.
///
/// Only used when addressing the content store on disk, never for identity
/// comparisons.
pub fn to_fs_relative(path: &str) -> PathBuf {
    canonicalize(path)
        .trim_matches('/')
        .split('/')
        .filter(|p| !p.is_empty())
        .collect()
}

/// The final segment of a canonical path.  The root has an empty id.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// The directory part of a canonical path.  `dirname("/") == "/"`.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Join a child id onto a canonical path.
pub fn join(path: &str, id: &str) -> String {
    canonicalize(&format!("{}/{}", path, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        assert_eq!(canonicalize("blog/post"), "/blog/post");
        assert_eq!(canonicalize("/blog/post/"), "/blog/post");
        assert_eq!(canonicalize("//blog///post"), "/blog/post");
    }

    #[test]
    fn test_canonicalize_root() {
        assert_eq!(canonicalize(""), "/");
        assert_eq!(canonicalize("/"), "/");
        assert_eq!(canonicalize("///"), "/");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for p in ["", "/", "a//b/", "///x", "blog/2026//post"] {
            let once = canonicalize(p);
            assert_eq!(canonicalize(&once), once);
            assert!(once.starts_with('/'));
            assert!(!once.contains("//"));
        }
    }

    #[test]
    fn test_to_fs_relative() {
        let p = to_fs_relative("/blog/post-1");
        let expected: PathBuf = ["blog", "post-1"].iter().collect();
        assert_eq!(p, expected);
        assert_eq!(to_fs_relative("/"), PathBuf::new());
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/blog/post-1"), "post-1");
        assert_eq!(basename("/blog"), "blog");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/blog/post-1"), "/blog");
        assert_eq!(dirname("/blog"), "/");
        assert_eq!(dirname("/"), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/blog", "post-1"), "/blog/post-1");
        assert_eq!(join("/", "blog"), "/blog");
    }
}
