/// Forward/backward position within one gallery directory
///
/// The cursor snapshots the file names of a directory when it is selected
/// and walks them with wraparound. It never re-reads the directory; a new
/// `select_directory` call replaces the snapshot wholesale.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("gallery has no viewable files: {0}")]
    Empty(PathBuf),

    #[error("failed to list gallery: {0}")]
    Io(#[from] walkdir::Error),
}

#[derive(Debug, Default, Clone)]
pub struct GalleryCursor {
    directory: Option<PathBuf>,
    entries: Vec<OsString>,
    /// `entries.len()` right after selection, so the first advance lands on 0
    index: Option<usize>,
}

impl GalleryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `path` as the current gallery.
    ///
    /// Lists the direct, non-hidden, non-directory children of `path`,
    /// sorted by name. On failure the previous selection is left intact.
    /// Returns the number of entries on success.
    pub fn select_directory(&mut self, path: &Path) -> Result<usize, SelectError> {
        if !path.is_dir() {
            return Err(SelectError::NotADirectory(path.to_path_buf()));
        }

        let entries = list_entries(path)?;
        if entries.is_empty() {
            return Err(SelectError::Empty(path.to_path_buf()));
        }

        let count = entries.len();
        debug!(directory = %path.display(), count, "gallery selected");

        self.directory = Some(path.to_path_buf());
        self.index = Some(count);
        self.entries = entries;
        Ok(count)
    }

    /// Move to the next file, wrapping to the first after the last.
    /// Returns `None` if no gallery is selected.
    pub fn advance(&mut self) -> Option<PathBuf> {
        self.step(true)
    }

    /// Move to the previous file, wrapping to the last before the first.
    /// Returns `None` if no gallery is selected.
    pub fn retreat(&mut self) -> Option<PathBuf> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Option<PathBuf> {
        let directory = self.directory.as_ref()?;
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        let index = self.index.unwrap_or(self.entries.len());

        let next = if forward {
            if index >= last { 0 } else { index + 1 }
        } else if index == 0 {
            last
        } else {
            (index - 1).min(last)
        };

        self.index = Some(next);
        Some(directory.join(&self.entries[next]))
    }

    /// The file at the current position, if the cursor has moved since the
    /// last selection
    pub fn current(&self) -> Option<PathBuf> {
        let directory = self.directory.as_ref()?;
        let index = self.index?;
        self.entries.get(index).map(|name| directory.join(name))
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn entries(&self) -> &[OsString] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of the direct, non-hidden, non-directory children of `path`
fn list_entries(path: &Path) -> Result<Vec<OsString>, walkdir::Error> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        // Names are kept byte-exact; only the hidden check looks at text
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.file_name().to_owned());
    }
    Ok(entries)
}
