/// Album directories under the gallery root
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// List the immediate, non-hidden subdirectories of `root`, sorted by name.
///
/// A missing or unreadable root means nothing is available yet (no
/// package has been downloaded, or storage is not mounted). That is
/// logged and reported as an empty list.
pub fn list_galleries(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        warn!(root = %root.display(), "gallery root is not available");
        return Vec::new();
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable gallery entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lists_album_directories_only() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("summer")).unwrap();
        fs::create_dir(root.path().join("autumn")).unwrap();
        fs::create_dir(root.path().join(".staging")).unwrap();
        fs::write(root.path().join("stray.jpg"), b"x").unwrap();

        let galleries = list_galleries(root.path());
        assert_eq!(
            galleries,
            vec![root.path().join("autumn"), root.path().join("summer")]
        );
    }

    #[test]
    fn test_missing_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_galleries(&root.path().join("absent")).is_empty());
    }
}
