// Key-value blob storage backends

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// String-keyed blob store, shaped like the browser's local storage API
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Validate a storage key: non-empty, alphanumeric plus `_`, `-`, `.`
///
/// Keys become filenames for [`FileStorage`], so path separators and `..` are refused.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.starts_with('.') {
        return Err(eyre!("Storage key cannot start with '.': {}", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
        return Err(eyre!(
            "Storage key must contain only alphanumeric characters, '_', '-' or '.': {}",
            key
        ));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Volatile store backed by a `HashMap`
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a file store rooted at `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create storage directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path).context("Failed to open storage file")?;
        FileExt::lock_shared(&file).context("Failed to acquire shared file lock")?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read storage file")?;

        Ok(Some(content))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open storage file for writing")?;

        // Truncate only once the lock is held so readers never see a partial blob
        file.lock_exclusive().context("Failed to acquire file lock")?;
        file.set_len(0)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        debug!(file = ?path, bytes = value.len(), "set_item: wrote blob");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let path = self.item_path(key)?;
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove storage file")?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Single-table key-value store in a SQLite database
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    /// Database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        debug!("Creating key-value schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}
