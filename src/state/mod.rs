/// State management module
///
/// This module handles the persisted catalog state:
/// - Album catalog (albums.rs)
/// - Decryption key catalog (keys.rs)
/// - Shared row structures (data.rs)
///
/// Each store owns its own SQLite connection and is constructed
/// explicitly by the application; nothing here is a global.

pub mod albums;
pub mod data;
pub mod keys;

pub use albums::AlbumStore;
pub use data::{Album, KeyRecord, NewAlbum};
pub use keys::KeyStore;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("key id {0:?} is already stored")]
    DuplicateKeyId(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Open a database file, creating its parent directory first
fn open_connection(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

/// `?1, ?2, ...` for an `IN (...)` clause of `n` values
fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?1");
        assert_eq!(placeholders(3), "?1, ?2, ?3");
    }
}
