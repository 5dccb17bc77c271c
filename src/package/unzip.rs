/// Zip extraction into an album directory
use std::fs::{self, File};
use std::io::{copy, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

use super::PackageError;

/// Extract every entry of `archive` under `dest`.
///
/// Entries that would land outside `dest` (absolute paths, `..`) abort the
/// extraction. When every entry sits under one top-level folder, that
/// folder is dropped so its files land directly in `dest`.
///
/// Entries are written to a hidden scratch directory next to `dest` and
/// only moved into `dest` once the whole archive has been read, so a
/// failed extraction leaves `dest` untouched. Returns the number of files
/// written.
pub fn extract_all(archive: &Path, dest: &Path) -> Result<usize, PackageError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;

    let parent = dest.parent().unwrap_or(dest);
    fs::create_dir_all(parent)?;
    let scratch = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)?;

    let count = extract_into(&mut zip, scratch.path())?;
    move_children(scratch.path(), dest)?;

    debug!(archive = %archive.display(), dest = %dest.display(), count, "package extracted");
    Ok(count)
}

fn extract_into<R: Read + Seek>(zip: &mut ZipArchive<R>, dest: &Path) -> Result<usize, PackageError> {
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    let wrapper = common_folder(&names);

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = match &wrapper {
            Some(folder) => entry.name()[folder.len() + 1..].to_string(),
            None => entry.name().to_string(),
        };
        if name.is_empty() {
            continue;
        }
        let out_path = safe_join(dest, &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&out_path)?;
        copy(&mut entry, &mut outfile)?;
        outfile.flush()?;
        count += 1;
    }
    Ok(count)
}

/// The single top-level folder every entry lives under, if there is one
fn common_folder(names: &[String]) -> Option<String> {
    let mut folder: Option<&str> = None;
    for name in names {
        let (first, _) = name.split_once('/')?;
        if first.is_empty() || first == "." || first == ".." {
            return None;
        }
        match folder {
            Some(f) if f != first => return None,
            _ => folder = Some(first),
        }
    }
    folder.map(str::to_string)
}

/// Move every child of `from` into `dest`, creating `dest` if needed
fn move_children(from: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        fs::rename(entry.path(), dest.join(entry.file_name()))?;
    }
    Ok(())
}

/// Join a relative entry name onto `base`, refusing anything that escapes it
pub fn safe_join(base: &Path, entry_name: &str) -> Result<PathBuf, PackageError> {
    let mut out = PathBuf::from(base);
    for comp in Path::new(entry_name).components() {
        match comp {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(PackageError::UnsafeEntry(entry_name.to_string())),
        }
    }
    if out == base {
        return Err(PackageError::UnsafeEntry(entry_name.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/tmp/base");
        assert!(safe_join(base, "../evil").is_err());
        assert!(safe_join(base, "/abs/path").is_err());
        assert!(safe_join(base, "").is_err());
        assert_eq!(
            safe_join(base, "./dir/photo.jpg").unwrap(),
            base.join("dir").join("photo.jpg")
        );
    }

    #[test]
    fn test_extract_all() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("album.zip");
        write_zip(
            &zip_path,
            &[("a.jpg", b"one"), ("raw/", b""), ("raw/b.jpg", b"two")],
        );

        let dest = dir.path().join("out");
        assert_eq!(extract_all(&zip_path, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("a.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(dest.join("raw").join("b.jpg")).unwrap(), b"two");
    }

    #[test]
    fn test_extract_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("evil.zip");
        write_zip(&zip_path, &[("../evil.txt", b"bad")]);

        let dest = dir.path().join("out");
        assert!(matches!(
            extract_all(&zip_path, &dest),
            Err(PackageError::UnsafeEntry(_))
        ));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn test_unsafe_entry_leaves_no_partial_album() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("mixed.zip");
        write_zip(
            &zip_path,
            &[("a.jpg", b"one"), ("b.jpg", b"two"), ("../evil.txt", b"bad")],
        );

        let dest = dir.path().join("album");
        assert!(extract_all(&zip_path, &dest).is_err());
        assert!(!dest.exists());
        // Only the archive is left; the scratch directory is gone
        let left: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn test_single_top_level_folder_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("trip.zip");
        write_zip(
            &zip_path,
            &[("trip/", b""), ("trip/a.jpg", b"one"), ("trip/raw/b.jpg", b"two")],
        );

        let dest = dir.path().join("album");
        assert_eq!(extract_all(&zip_path, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("a.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(dest.join("raw").join("b.jpg")).unwrap(), b"two");
        assert!(!dest.join("trip").exists());
    }

    #[test]
    fn test_common_folder() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(common_folder(&names(&["t/", "t/a.jpg"])), Some("t".to_string()));
        assert_eq!(common_folder(&names(&["t/a.jpg", "u/b.jpg"])), None);
        assert_eq!(common_folder(&names(&["t/a.jpg", "b.jpg"])), None);
        assert_eq!(common_folder(&names(&["../a.jpg"])), None);
        assert_eq!(common_folder(&[]), None);
    }

    #[test]
    fn test_extract_into_existing_album() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("album");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("old.jpg"), b"old").unwrap();

        let zip_path = dir.path().join("more.zip");
        write_zip(&zip_path, &[("new.jpg", b"new")]);
        assert_eq!(extract_all(&zip_path, &dest).unwrap(), 1);
        assert!(dest.join("old.jpg").exists());
        assert!(dest.join("new.jpg").exists());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(
            extract_all(&path, &dir.path().join("out")),
            Err(PackageError::Zip(_))
        ));
    }
}
