//! ALFA Notes Vault - Key-Value Storage
//!
//! Device-local persistence behind a small trait. Values are opaque bytes;
//! everything sensitive is already ciphertext by the time it arrives here.
//! Keys are [`StorageKey`]s, which only the registry can mint.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::VaultResult;
use crate::registry::StorageKey;

/// One write in an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set(StorageKey, Vec<u8>),
    Delete(StorageKey),
}

/// Device-local key-value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &StorageKey) -> VaultResult<Option<Vec<u8>>>;

    fn set(&self, key: &StorageKey, value: &[u8]) -> VaultResult<()>;

    /// Deleting a missing key is not an error
    fn delete(&self, key: &StorageKey) -> VaultResult<()>;

    /// Raw names of every key starting with `prefix`, sorted
    fn list_keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>>;

    /// Apply all writes or none of them
    fn apply(&self, batch: &[WriteOp]) -> VaultResult<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY
// ═══════════════════════════════════════════════════════════════════════════

/// Volatile store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> VaultResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key.as_str()).cloned())
    }

    fn set(&self, key: &StorageKey, value: &[u8]) -> VaultResult<()> {
        self.entries
            .write()
            .insert(key.as_str().to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> VaultResult<()> {
        self.entries.write().remove(key.as_str());
        Ok(())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn apply(&self, batch: &[WriteOp]) -> VaultResult<()> {
        // Single write guard: readers never observe a half-applied batch
        let mut entries = self.entries.write();
        for op in batch {
            match op {
                WriteOp::Set(key, value) => {
                    entries.insert(key.as_str().to_string(), value.clone());
                }
                WriteOp::Delete(key) => {
                    entries.remove(key.as_str());
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SQLITE
// ═══════════════════════════════════════════════════════════════════════════

/// Durable store backed by a single SQLite table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> VaultResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Private database that disappears with the store
    pub fn open_in_memory() -> VaultResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> VaultResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &StorageKey) -> VaultResult<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &StorageKey, value: &[u8]) -> VaultResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key.as_str(), value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> VaultResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
        let conn = self.conn.lock();
        // substr() rather than LIKE so '_' and '%' in prefixes stay literal
        let mut stmt = conn.prepare(
            "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn apply(&self, batch: &[WriteOp]) -> VaultResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for op in batch {
            match op {
                WriteOp::Set(key, value) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                        params![key.as_str(), value, now],
                    )?;
                }
                WriteOp::Delete(key) => {
                    tx.execute("DELETE FROM kv WHERE key = ?1", params![key.as_str()])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}
