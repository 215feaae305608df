// Store configuration and backend wiring

use crate::persist::DEFAULT_NAMESPACE;
use crate::storage::{FileStorage, KeyValueStore, SqliteStorage, validate_key};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CURRENT_VERSION: u32 = 1;

/// Name of the configuration file inside the store directory
pub const CONFIG_FILE: &str = "config.yml";

/// Filename of the SQLite database used by [`Backend::Sqlite`]
pub const DB_FILE: &str = "todostore.db";

/// Where the key-value blobs live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

/// Contents of `config.yml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage key the task collection is saved under
    pub namespace: String,
    pub backend: Backend,
    /// Refuse to commit an edit whose text is blank
    pub reject_blank_edits: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            backend: Backend::default(),
            reject_blank_edits: false,
        }
    }
}

impl Config {
    /// Load `config.yml` from the store directory, falling back to defaults when absent
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(file = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))?;
        info!(file = ?path, backend = ?config.backend, namespace = %config.namespace, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).context("Failed to parse config YAML")?;
        validate_key(&config.namespace)?;
        Ok(config)
    }
}

/// Resolve the store directory.
///
/// An explicit path gets a `.todostore` subdirectory; otherwise the user's data directory is used.
pub fn resolve_store_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.join(".todostore")),
        None => dirs::data_dir()
            .map(|dir| dir.join("todostore"))
            .ok_or_else(|| eyre!("Could not determine a data directory; pass --store-path")),
    }
}

/// Prepare the store directory and open the configured backend
pub fn open_storage(store_dir: &Path, config: &Config) -> Result<Box<dyn KeyValueStore>> {
    fs::create_dir_all(store_dir).context("Failed to create store directory")?;
    create_gitignore(store_dir)?;
    write_version(store_dir)?;

    let storage: Box<dyn KeyValueStore> = match config.backend {
        Backend::File => Box::new(FileStorage::open(store_dir)?),
        Backend::Sqlite => Box::new(SqliteStorage::open(store_dir.join(DB_FILE))?),
    };

    debug!(dir = ?store_dir, backend = ?config.backend, "Opened storage");
    Ok(storage)
}

fn create_gitignore(store_dir: &Path) -> Result<()> {
    let gitignore_path = store_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, "todostore.db\ntodostore.db-shm\ntodostore.db-wal\n")?;
    }
    Ok(())
}

fn write_version(store_dir: &Path) -> Result<()> {
    let version_path = store_dir.join(".version");
    if !version_path.exists() {
        fs::write(version_path, CURRENT_VERSION.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.namespace, "todos");
        assert_eq!(config.backend, Backend::File);
        assert!(!config.reject_blank_edits);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_yaml("backend: sqlite\n").unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.namespace, "todos");
    }

    #[test]
    fn test_full_config_from_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "namespace: work\nbackend: file\nreject_blank_edits: true\n",
        )
        .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.namespace, "work");
        assert!(config.reject_blank_edits);
    }

    #[test]
    fn test_empty_config_file() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_yaml("backend: floppy\n").is_err());
        assert!(Config::from_yaml("namespace: ../etc\n").is_err());
        assert!(Config::from_yaml("- not\n- a map\n").is_err());
    }

    #[test]
    fn test_resolve_explicit_store_dir() {
        let dir = resolve_store_dir(Some(Path::new("/tmp/project"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/project/.todostore"));
    }

    #[test]
    fn test_open_storage_creates_layout() {
        let temp = TempDir::new().unwrap();
        let store_dir = temp.path().join(".todostore");

        let mut storage = open_storage(&store_dir, &Config::default()).unwrap();
        storage.set_item("todos", "[]").unwrap();

        assert!(store_dir.join(".gitignore").exists());
        assert!(store_dir.join(".version").exists());
        assert!(store_dir.join("todos.json").exists());
    }

    #[test]
    fn test_open_sqlite_storage() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            backend: Backend::Sqlite,
            ..Config::default()
        };

        let mut storage = open_storage(temp.path(), &config).unwrap();
        storage.set_item("todos", "[]").unwrap();

        assert!(temp.path().join(DB_FILE).exists());
        assert_eq!(storage.get_item("todos").unwrap().as_deref(), Some("[]"));
    }
}
