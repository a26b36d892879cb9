use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key/value persistence for small user preferences.
pub trait PreferenceStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(data_dir: &Path) -> Result<Self> {
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)?;
        }

        let db_path = data_dir.join("preferences.db");
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs_next::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home_dir.join(".hacker_stories"))
    }
}

impl PreferenceStore for Database {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().map_err(|_| anyhow!("Failed to lock database connection"))?;
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| anyhow!("Failed to lock database connection"))?;
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }
}

/// A string value that is loaded from a [`PreferenceStore`] once and written
/// back every time it changes.
pub struct SemiPersistentState {
    store: Arc<dyn PreferenceStore>,
    key: String,
    value: String,
}

impl SemiPersistentState {
    pub fn new(store: Arc<dyn PreferenceStore>, key: &str, initial: &str) -> Self {
        let stored = match store.read(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, "Failed to read preference: {}", e);
                None
            }
        };

        // An empty stored value counts as unset.
        let value = stored
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| initial.to_string());

        let state = Self {
            store,
            key: key.to_string(),
            value,
        };
        state.persist();
        state
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value == self.value {
            return;
        }
        self.value = value;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.write(&self.key, &self.value) {
            tracing::warn!(key = %self.key, "Failed to persist preference: {}", e);
        }
    }
}
