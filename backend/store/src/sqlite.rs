//! SQLite-backed history, usage counters and role directory.
//!
//! One connection behind an async mutex; every operation is a single
//! statement, so counter increments are atomic without extra locking.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use slackbud_commands::{HistoryEntry, HistoryStore, RoleDirectory, RoleEntry, UsageCounter};
use slackbud_core::PermissionLevel;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS history (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id      TEXT NOT NULL,
        command_line TEXT NOT NULL,
        at_ms        INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_history_user ON history(user_id, at_ms);
    CREATE TABLE IF NOT EXISTS usage (
        task  TEXT PRIMARY KEY,
        count INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS roles (
        user_id   TEXT PRIMARY KEY,
        user_name TEXT NOT NULL,
        level     TEXT NOT NULL
    );";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {parent:?}"))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite store")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA).context("Failed to initialize store schema")?;
        info!("SqliteStore opened at {:?}", path);
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests and one-shot CLI runs).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert a role unless the user already has one.
    pub async fn seed_role(&self, user_id: &str, user_name: &str, level: PermissionLevel) -> Result<bool> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO roles (user_id, user_name, level) VALUES (?1, ?2, ?3)",
            params![user_id, user_name, level.as_str()],
        )?;
        Ok(inserted > 0)
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn record(&self, user_id: &str, command_line: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO history (user_id, command_line, at_ms) VALUES (?1, ?2, ?3)",
            params![user_id, command_line, at.timestamp_millis()],
        )?;
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT user_id, command_line, at_ms FROM history
             WHERE user_id = ?1 ORDER BY at_ms DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let at_ms: i64 = row.get(2)?;
                Ok(HistoryEntry {
                    user_id: row.get(0)?,
                    command_line: row.get(1)?,
                    at: Utc.timestamp_millis_opt(at_ms).single().unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl UsageCounter for SqliteStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "INSERT INTO usage (task, count) VALUES (?1, 1)
             ON CONFLICT(task) DO UPDATE SET count = count + 1
             RETURNING count",
            params![key],
            |row| row.get(0),
        )?;
        debug!(key, count, "Usage incremented");
        Ok(count as u64)
    }

    async fn top(&self, limit: usize) -> Result<Vec<(String, u64)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT task, count FROM usage ORDER BY count DESC, task ASC LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get(0)?, count as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl RoleDirectory for SqliteStore {
    async fn level_of(&self, user_id: &str) -> Result<PermissionLevel> {
        let conn = self.conn.lock().await;
        let level = conn
            .query_row("SELECT level FROM roles WHERE user_id = ?1", params![user_id], |row| {
                parse_level(row, 0)
            })
            .optional()?;
        Ok(level.unwrap_or_default())
    }

    async fn set_level(&self, user_id: &str, user_name: &str, level: PermissionLevel) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO roles (user_id, user_name, level) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET user_name = excluded.user_name, level = excluded.level",
            params![user_id, user_name, level.as_str()],
        )?;
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute("DELETE FROM roles WHERE user_id = ?1", params![user_id])?;
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<RoleEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT user_id, user_name, level FROM roles ORDER BY user_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RoleEntry {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                    level: parse_level(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn parse_level(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<PermissionLevel> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
