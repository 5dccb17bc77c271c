use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::info;

use super::data::KeyRecord;
use super::{open_connection, placeholders, StoreError, StoreResult};

const KEY_COLUMNS: &str = "id, key_id, secret, name";

/// The key catalog.
///
/// Keys are insert-only: an update could leave two records disagreeing
/// about which secret a key id maps to, so none is offered. Remove and
/// re-import instead.
pub struct KeyStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl KeyStore {
    /// Open (or create) the key database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = open_connection(path)?;
        let store = KeyStore {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        info!(path = %path.display(), "key store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let store = KeyStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS keys (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                key_id  TEXT NOT NULL UNIQUE,
                secret  TEXT NOT NULL,
                name    TEXT NOT NULL
            )",
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
            .query_row("SELECT COUNT(*) FROM keys", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a key. A key id that is already stored is rejected.
    pub fn insert(&self, key_id: &str, secret: &str, name: &str) -> StoreResult<KeyRecord> {
        let result = self.conn.execute(
            "INSERT INTO keys (key_id, secret, name) VALUES (?1, ?2, ?3)",
            params![key_id, secret, name],
        );

        match result {
            Ok(_) => Ok(KeyRecord {
                id: self.conn.last_insert_rowid(),
                key_id: key_id.to_string(),
                secret: secret.to_string(),
                name: name.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKeyId(key_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM keys WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Remove every key. Returns the number of rows deleted.
    pub fn purge(&self) -> StoreResult<usize> {
        let deleted = self.conn.execute("DELETE FROM keys", [])?;
        if deleted > 0 {
            info!(deleted, "key store purged");
        }
        Ok(deleted)
    }

    pub fn by_id(&self, id: i64) -> StoreResult<Option<KeyRecord>> {
        let key = self
            .conn
            .query_row(
                &format!("SELECT {KEY_COLUMNS} FROM keys WHERE id = ?1"),
                params![id],
                key_from_row,
            )
            .optional()?;
        Ok(key)
    }

    /// Lookup by the externally supplied key id
    pub fn by_key_id(&self, key_id: &str) -> StoreResult<Option<KeyRecord>> {
        let key = self
            .conn
            .query_row(
                &format!("SELECT {KEY_COLUMNS} FROM keys WHERE key_id = ?1"),
                params![key_id],
                key_from_row,
            )
            .optional()?;
        Ok(key)
    }

    pub fn by_ids(&self, ids: &[i64]) -> StoreResult<Vec<KeyRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {KEY_COLUMNS} FROM keys WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), key_from_row)?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    pub fn all(&self) -> StoreResult<Vec<KeyRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {KEY_COLUMNS} FROM keys ORDER BY id"))?;
        let rows = stmt.query_map([], key_from_row)?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        id: row.get(0)?,
        key_id: row.get(1)?,
        secret: row.get(2)?,
        name: row.get(3)?,
    })
}

// Keep secrets out of debug output
impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup_by_key_id() {
        let store = KeyStore::open_in_memory().unwrap();
        let key = store.insert("abc", "c2VjcmV0", "Test").unwrap();

        assert_eq!(store.by_key_id("abc").unwrap(), Some(key.clone()));
        assert_eq!(store.by_id(key.id).unwrap(), Some(key));
        assert_eq!(store.by_key_id("missing").unwrap(), None);
    }

    #[test]
    fn test_duplicate_key_id_is_rejected() {
        let store = KeyStore::open_in_memory().unwrap();
        store.insert("abc", "Zmlyc3Q=", "first").unwrap();

        let err = store.insert("abc", "c2Vjb25k", "second").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKeyId(ref id) if id == "abc"));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.by_key_id("abc").unwrap().unwrap().secret, "Zmlyc3Q=");
    }

    #[test]
    fn test_by_ids_all_delete_purge() {
        let store = KeyStore::open_in_memory().unwrap();
        let a = store.insert("a", "YQ==", "A").unwrap();
        let b = store.insert("b", "Yg==", "B").unwrap();
        let c = store.insert("c", "Yw==", "C").unwrap();

        assert_eq!(store.by_ids(&[c.id, a.id]).unwrap(), vec![a.clone(), c.clone()]);
        assert_eq!(store.all().unwrap(), vec![a.clone(), b.clone(), c]);

        assert!(store.delete(b.id).unwrap());
        assert!(!store.delete(b.id).unwrap());
        assert_eq!(store.count().unwrap(), 2);

        assert_eq!(store.purge().unwrap(), 2);
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_key_id_can_be_reused_after_delete() {
        let store = KeyStore::open_in_memory().unwrap();
        let old = store.insert("k", "b2xk", "old").unwrap();
        store.delete(old.id).unwrap();

        let new = store.insert("k", "bmV3", "new").unwrap();
        assert_ne!(new.id, old.id);
        assert_eq!(store.by_key_id("k").unwrap().unwrap().name, "new");
    }
}
