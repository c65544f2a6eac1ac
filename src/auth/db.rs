//! Auth Database
//! Mission: Own the single SQLite connection shared by the user and session stores
//!
//! ```sql
//! users    (id INTEGER PK AUTOINCREMENT, username, email UNIQUE, password_hash, role, created_at)
//! sessions (id TEXT PK, user_id -> users.id, expires_at unix ms, created_at unix ms)
//! ```

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::errors::AuthError;

const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('player', 'watcher')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_sessions_expires_at
    ON sessions(expires_at);
"#;

/// Storage handle passed to every store. Cloning shares the connection.
#[derive(Clone)]
pub struct AuthDb {
    conn: Arc<Mutex<Connection>>,
}

impl AuthDb {
    /// Open (or create) the database file and apply the schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let conn = Connection::open(path.as_ref())?;

        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        if journal_mode.to_lowercase() != "wal" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        let db = Self::from_connection(conn)?;
        info!("🔐 Auth database ready at: {}", path.as_ref().display());
        Ok(db)
    }

    /// In-memory database with the same schema (tests)
    pub fn in_memory() -> Result<Self, AuthError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, AuthError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Every statement runs while this guard is held.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(db: &AuthDb) -> Vec<String> {
        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_schema_created() {
        let db = AuthDb::in_memory().unwrap();
        let tables = table_names(&db);
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        AuthDb::open(temp.path()).unwrap();
        let db = AuthDb::open(temp.path()).unwrap();
        assert!(table_names(&db).contains(&"users".to_string()));
    }

    #[test]
    fn test_role_check_constraint() {
        let db = AuthDb::in_memory().unwrap();
        let res = db.conn().execute(
            "INSERT INTO users (username, email, password_hash, role, created_at)
             VALUES ('x', 'x@x.com', 'h', 'admin', '')",
            [],
        );
        assert!(res.is_err());
    }
}
