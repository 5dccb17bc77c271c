use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::info;

use super::data::{Album, NewAlbum};
use super::{open_connection, placeholders, StoreResult};

const ALBUM_COLUMNS: &str =
    "id, remote_location, local_location, name, last_viewed, downloaded";

/// The album catalog: one row per unpacked package.
pub struct AlbumStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl AlbumStore {
    /// Open (or create) the album database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = open_connection(path)?;
        let store = AlbumStore {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        info!(path = %path.display(), "album store opened");
        Ok(store)
    }

    /// A private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = AlbumStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS albums (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                remote_location TEXT NOT NULL,
                local_location  TEXT,
                name            TEXT NOT NULL,
                last_viewed     INTEGER NOT NULL,
                downloaded      INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_albums_last_viewed
             ON albums(last_viewed DESC)",
            [],
        )?;

        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn count(&self) -> StoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM albums", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a new album; it counts as viewed at download time
    pub fn insert(&self, album: &NewAlbum) -> StoreResult<Album> {
        self.conn.execute(
            "INSERT INTO albums (remote_location, local_location, name, last_viewed, downloaded)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                album.remote_location,
                album.local_location,
                album.name,
                album.downloaded,
            ],
        )?;

        Ok(Album {
            id: self.conn.last_insert_rowid(),
            remote_location: album.remote_location.clone(),
            local_location: album.local_location.clone(),
            name: album.name.clone(),
            last_viewed: album.downloaded,
            downloaded: album.downloaded,
        })
    }

    /// Overwrite every column of an existing album.
    /// Returns false if no album has that id.
    pub fn update(&self, album: &Album) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE albums SET remote_location = ?1, local_location = ?2, name = ?3,
                last_viewed = ?4, downloaded = ?5
             WHERE id = ?6",
            params![
                album.remote_location,
                album.local_location,
                album.name,
                album.last_viewed,
                album.downloaded,
                album.id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Stamp an album as viewed at `at` (unix seconds)
    pub fn mark_viewed(&self, id: i64, at: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE albums SET last_viewed = ?1 WHERE id = ?2",
            params![at, id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM albums WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Remove every album. Returns the number of rows deleted.
    pub fn purge(&self) -> StoreResult<usize> {
        let deleted = self.conn.execute("DELETE FROM albums", [])?;
        if deleted > 0 {
            info!(deleted, "album store purged");
        }
        Ok(deleted)
    }

    pub fn by_id(&self, id: i64) -> StoreResult<Option<Album>> {
        let album = self
            .conn
            .query_row(
                &format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?1"),
                params![id],
                album_from_row,
            )
            .optional()?;
        Ok(album)
    }

    /// Albums whose id is in `ids`, ordered by id
    pub fn by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Album>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), album_from_row)?;

        let mut albums = Vec::new();
        for album in rows {
            albums.push(album?);
        }
        Ok(albums)
    }

    /// All albums that have been unpacked locally, newest download first
    pub fn all_with_location(&self) -> StoreResult<Vec<Album>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums
             WHERE local_location IS NOT NULL
             ORDER BY downloaded DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], album_from_row)?;

        let mut albums = Vec::new();
        for album in rows {
            albums.push(album?);
        }
        Ok(albums)
    }

    /// The locally available album opened most recently
    pub fn most_recently_viewed(&self) -> StoreResult<Option<Album>> {
        let album = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ALBUM_COLUMNS} FROM albums
                     WHERE local_location IS NOT NULL
                     ORDER BY last_viewed DESC, id DESC
                     LIMIT 1"
                ),
                [],
                album_from_row,
            )
            .optional()?;
        Ok(album)
    }
}

fn album_from_row(row: &Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        remote_location: row.get(1)?,
        local_location: row.get(2)?,
        name: row.get(3)?,
        last_viewed: row.get(4)?,
        downloaded: row.get(5)?,
    })
}

impl std::fmt::Debug for AlbumStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
