/// Filesystem side of the viewer
///
/// Owns the gallery cursor and knows where albums live under the gallery
/// root. Installing a package (decrypt, then unzip or move) is a blocking
/// function so the caller can push it onto a blocking thread.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::error::{AppError, Result};
use crate::gallery::{list_galleries, GalleryCursor, SelectError};
use crate::link::{DownloadIntent, UNSPECIFIED_NAME};
use crate::net::DownloadedFile;
use crate::package::{decrypt_file, extract_all, safe_join, PackageError};

/// Hidden directory under the gallery root for in-flight downloads
const STAGING_DIR: &str = ".staging";

#[derive(Debug)]
pub struct FileController {
    gallery_root: PathBuf,
    cursor: GalleryCursor,
}

impl FileController {
    pub fn new(gallery_root: impl Into<PathBuf>) -> Self {
        Self {
            gallery_root: gallery_root.into(),
            cursor: GalleryCursor::new(),
        }
    }

    pub fn gallery_root(&self) -> &Path {
        &self.gallery_root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.gallery_root.join(STAGING_DIR)
    }

    /// Album directories currently under the gallery root
    pub fn galleries(&self) -> Vec<PathBuf> {
        list_galleries(&self.gallery_root)
    }

    pub fn select(&mut self, directory: &Path) -> std::result::Result<usize, SelectError> {
        self.cursor.select_directory(directory)
    }

    pub fn cursor(&self) -> &GalleryCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut GalleryCursor {
        &mut self.cursor
    }

    /// Album directory for a download: the link's destination, else its
    /// display name, else the stem of the source file name. Always a
    /// relative path below the gallery root.
    pub fn album_dir_for(&self, intent: &DownloadIntent) -> Result<PathBuf> {
        let relative = intent
            .destination
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                Some(intent.display_name.clone())
                    .filter(|n| !n.trim().is_empty() && n != UNSPECIFIED_NAME)
            })
            .unwrap_or_else(|| stem_of(&intent.location));

        let dir = safe_join(&self.gallery_root, &relative)
            .map_err(|_| AppError::InvalidDestination(relative.clone()))?;
        if dir.starts_with(self.staging_dir()) {
            return Err(AppError::InvalidDestination(relative));
        }
        Ok(dir)
    }
}

/// What to do with a finished download
#[derive(Debug)]
pub struct InstallPlan {
    pub staging_dir: PathBuf,
    pub album_dir: PathBuf,
    pub is_zipped: bool,
    /// Key bytes and IV when the package is encrypted
    pub decryption: Option<(Vec<u8>, Vec<u8>)>,
}

/// Decrypt and unpack a downloaded package into its album directory.
/// Returns the number of files placed in the album.
pub fn install_package(downloaded: DownloadedFile, plan: &InstallPlan) -> Result<usize> {
    fs::create_dir_all(&plan.staging_dir)?;

    // Keeps the decrypted temp file alive until the end of the install
    let mut decrypted: Option<NamedTempFile> = None;
    if let Some((key, iv)) = &plan.decryption {
        let out = tempfile::Builder::new()
            .prefix(".decrypted-")
            .tempfile_in(&plan.staging_dir)?;
        decrypt_file(downloaded.file.path(), out.path(), key, iv)?;
        decrypted = Some(out);
    }

    if plan.is_zipped {
        let archive = decrypted
            .as_ref()
            .map(|f| f.path())
            .unwrap_or_else(|| downloaded.file.path());
        let count = extract_all(archive, &plan.album_dir)?;
        info!(album = %plan.album_dir.display(), count, "package unpacked");
        return Ok(count);
    }

    fs::create_dir_all(&plan.album_dir)?;
    let target = safe_join(&plan.album_dir, &downloaded.file_name)?;
    let payload = decrypted.unwrap_or(downloaded.file);
    payload
        .persist(&target)
        .map_err(|e| PackageError::Io(e.error))?;
    debug!(target = %target.display(), "single file placed in album");
    Ok(1)
}

/// File stem of the last URL segment, or "album"
fn stem_of(url: &Url) -> String {
    let name = crate::net::download::file_name_of(url);
    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('.'))
        .unwrap_or_else(|| "album".to_string())
}
