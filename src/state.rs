//! Persistent per-package notifier state
//!
//! One row per store key (`notifier-state-<package>`) holding the opt-out
//! flag, the last check timestamp and the pending update, if any. Rows are
//! created lazily and never deleted. Concurrent writers are last-writer-wins.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::version::types::UpdateInfo;

/// Snapshot of one package's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub opt_out: bool,
    /// Epoch milliseconds of the last completed check, or of creation
    pub last_update_check: i64,
    pub pending_update: Option<UpdateInfo>,
}

/// Durable storage for notifier state, keyed by store key
#[cfg_attr(test, automock)]
pub trait StateStore: Send + Sync {
    /// Load the state for `key`, creating it with `last_update_check = now_ms`
    /// when it does not exist yet
    fn load(&self, key: &str, now_ms: i64) -> Result<PersistedState, StoreError>;

    /// Delete the pending update, if any
    fn clear_pending_update(&self, key: &str) -> Result<(), StoreError>;

    /// Stamp `last_update_check`; when `update` is given it replaces the
    /// pending update, otherwise the pending update is left as is
    fn record_check(
        &self,
        key: &str,
        checked_at_ms: i64,
        update: Option<UpdateInfo>,
    ) -> Result<(), StoreError>;

    fn set_opt_out(&self, key: &str, opt_out: bool, now_ms: i64) -> Result<(), StoreError>;
}

/// SQLite-backed [`StateStore`]
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `db_path`, creating parent directories.
    ///
    /// Fails with a permission error when the config directory belongs to
    /// another user, which callers turn into a store diagnostic.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening state store at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;

        // Runner and host may touch the file at the same time
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(500))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        debug!("State store ready");
        Ok(store)
    }

    /// In-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS notifier_state (
                store_key TEXT PRIMARY KEY,
                opt_out INTEGER NOT NULL DEFAULT 0,
                last_update_check INTEGER NOT NULL,
                pending_update TEXT
            )
            "#,
            [],
        )?;

        Ok(())
    }

    /// Insert a fresh row for `key` unless one exists
    fn ensure_row(conn: &Connection, key: &str, now_ms: i64) -> Result<(), StoreError> {
        conn.execute(
            r#"
            INSERT INTO notifier_state (store_key, opt_out, last_update_check)
            VALUES (?1, 0, ?2)
            ON CONFLICT(store_key) DO NOTHING
            "#,
            (key, now_ms),
        )?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self, key: &str, now_ms: i64) -> Result<PersistedState, StoreError> {
        let conn = self.lock_conn()?;
        Self::ensure_row(&conn, key, now_ms)?;

        let (opt_out, last_update_check, pending): (bool, i64, Option<String>) = conn.query_row(
            "SELECT opt_out, last_update_check, pending_update FROM notifier_state WHERE store_key = ?1",
            [key],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let pending_update = pending
            .map(|json| serde_json::from_str::<UpdateInfo>(&json))
            .transpose()?;

        Ok(PersistedState {
            opt_out,
            last_update_check,
            pending_update,
        })
    }

    fn clear_pending_update(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE notifier_state SET pending_update = NULL WHERE store_key = ?1",
            [key],
        )?;
        Ok(())
    }

    fn record_check(
        &self,
        key: &str,
        checked_at_ms: i64,
        update: Option<UpdateInfo>,
    ) -> Result<(), StoreError> {
        let pending = update.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.lock_conn()?;
        Self::ensure_row(&conn, key, checked_at_ms)?;
        conn.execute(
            r#"
            UPDATE notifier_state
            SET last_update_check = ?2,
                pending_update = COALESCE(?3, pending_update)
            WHERE store_key = ?1
            "#,
            (key, checked_at_ms, pending),
        )?;

        debug!("Recorded check for {} at {}", key, checked_at_ms);
        Ok(())
    }

    fn set_opt_out(&self, key: &str, opt_out: bool, now_ms: i64) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        Self::ensure_row(&conn, key, now_ms)?;
        conn.execute(
            "UPDATE notifier_state SET opt_out = ?2 WHERE store_key = ?1",
            (key, opt_out),
        )?;
        Ok(())
    }
}

/// Current time in milliseconds since the UNIX epoch
pub fn current_timestamp_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
