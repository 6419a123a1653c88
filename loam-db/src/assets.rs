//! Minimal static-asset tree.
//!
//! Assets mirror a directory on disk and support the same URL-resolution
//! contract as records; the pad falls back to this tree when content-tree
//! resolution fails.

use std::path::{Path, PathBuf};

/// A node of the static asset tree: a directory or a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    path: PathBuf,
    name: String,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Asset {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filesystem path backing this asset.
    pub fn fs_path(&self) -> &Path {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.path.is_dir()
    }

    /// Descend the asset tree along URL segments.
    ///
    /// Hidden entries and traversal segments are rejected.  Returns `None`
    /// when any segment does not exist on disk.
    pub fn resolve_url_path(&self, segments: &[&str]) -> Option<Asset> {
        let mut node = self.clone();
        for segment in segments {
            if segment.is_empty() {
                continue;
            }
            if segment.starts_with('.') || segment.contains('/') || segment.contains('\\') {
                return None;
            }
            if !node.path.is_dir() {
                return None;
            }
            let child = node.path.join(segment);
            if !child.exists() {
                return None;
            }
            node = Asset::new(child, *segment);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn asset_tree() -> (TempDir, Asset) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("css")).unwrap();
        fs::write(tmp.path().join("css/site.css"), "body {}").unwrap();
        fs::write(tmp.path().join("favicon.ico"), "x").unwrap();
        let root = Asset::new(tmp.path(), "");
        (tmp, root)
    }

    #[test]
    fn test_resolve_file() {
        let (_tmp, root) = asset_tree();
        let hit = root.resolve_url_path(&["css", "site.css"]).unwrap();
        assert_eq!(hit.name(), "site.css");
        assert!(!hit.is_directory());
    }

    #[test]
    fn test_resolve_directory() {
        let (_tmp, root) = asset_tree();
        let hit = root.resolve_url_path(&["css"]).unwrap();
        assert!(hit.is_directory());
    }

    #[test]
    fn test_resolve_missing() {
        let (_tmp, root) = asset_tree();
        assert!(root.resolve_url_path(&["missing.txt"]).is_none());
        assert!(root.resolve_url_path(&["favicon.ico", "nested"]).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let (_tmp, root) = asset_tree();
        assert!(root.resolve_url_path(&[".."]).is_none());
        assert!(root.resolve_url_path(&[".hidden"]).is_none());
    }

    #[test]
    fn test_empty_segments_resolve_to_self() {
        let (_tmp, root) = asset_tree();
        let hit = root.resolve_url_path(&[]).unwrap();
        assert_eq!(hit, root);
    }
}
