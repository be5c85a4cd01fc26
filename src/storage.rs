use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

/// One saved sign-in per server: the session cookies plus a snapshot of the
/// account they belong to.
#[derive(Debug, Clone, Default)]
pub struct SavedSession {
    pub id: i64,
    pub server: String,
    pub cookies: String,
    pub username: String,
    pub full_name: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "foreign_keys", &"ON")
            .context("storage: enable foreign keys")?;
        conn.pragma_update(None, "busy_timeout", &5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn upsert_session(&self, mut session: SavedSession) -> Result<i64> {
        if session.server.is_empty() {
            bail!("storage: session server required");
        }
        session.saved_at = Utc::now();

        let conn = self.conn.lock();
        let id: i64 = conn.query_row(
            r#"
INSERT INTO sessions (server, cookies, username, full_name, saved_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(server) DO UPDATE SET
  cookies = excluded.cookies,
  username = excluded.username,
  full_name = excluded.full_name,
  saved_at = excluded.saved_at
RETURNING id
"#,
            params![
                session.server,
                session.cookies,
                session.username,
                session.full_name,
                session.saved_at.timestamp(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn get_session(&self, server: &str) -> Result<Option<SavedSession>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
SELECT id, server, cookies, username, full_name, saved_at
FROM sessions
WHERE server = ?1
"#,
            params![server],
            session_from_row,
        )
        .optional()
        .context("storage: query session")
    }

    pub fn delete_session(&self, server: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE server = ?1", params![server])?;
        Ok(())
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SavedSession> {
    let saved: i64 = row.get(5)?;
    Ok(SavedSession {
        id: row.get(0)?,
        server: row.get(1)?,
        cookies: row.get(2)?,
        username: row.get(3)?,
        full_name: row.get(4)?,
        saved_at: Utc
            .timestamp_opt(saved, 0)
            .single()
            .unwrap_or_else(Utc::now),
    })
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS sessions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  server TEXT NOT NULL UNIQUE,
  cookies TEXT NOT NULL,
  username TEXT NOT NULL,
  full_name TEXT,
  saved_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_saved_at ON sessions(saved_at);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vidtube").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_in_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn session_roundtrip() {
        let dir = tempdir().unwrap();
        let store = Store::open(Options {
            path: Some(dir.path().join("state.db")),
        })
        .unwrap();

        let first = store
            .upsert_session(SavedSession {
                server: "https://tube.example.com/".into(),
                cookies: "accessToken=abc; refreshToken=def".into(),
                username: "chai".into(),
                full_name: "Chai Aunty".into(),
                ..SavedSession::default()
            })
            .unwrap();

        let second = store
            .upsert_session(SavedSession {
                server: "https://tube.example.com/".into(),
                cookies: "accessToken=xyz".into(),
                username: "chai".into(),
                full_name: "Chai Aunty".into(),
                ..SavedSession::default()
            })
            .unwrap();
        assert_eq!(first, second);

        let saved = store
            .get_session("https://tube.example.com/")
            .unwrap()
            .expect("session saved");
        assert_eq!(saved.cookies, "accessToken=xyz");

        store.delete_session("https://tube.example.com/").unwrap();
        assert!(store
            .get_session("https://tube.example.com/")
            .unwrap()
            .is_none());
    }
}
