//! Mission record store
//!
//! Minimal SQLite log of mission attempts. Records are created when a launch
//! is accepted, advanced only along
//! `IN_PROGRESS → (DELIVERED →) COMPLETED` or `→ FAILED: <reason>`, and never
//! deleted. `completed_at` is set exactly when a record reaches a terminal
//! status.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Mission record identifier
pub type MissionId = i64;

/// Errors raised by the mission store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Mission {0} not found")]
    NotFound(MissionId),

    #[error("Invalid transition for mission {id}: {from} -> {to}")]
    InvalidTransition {
        id: MissionId,
        from: String,
        to: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Mission status as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MissionStatus {
    InProgress,
    Delivered,
    Completed,
    Failed(String),
}

impl MissionStatus {
    /// Whether the record is closed
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Failed(_))
    }

    /// Check if the status may move to `next`
    pub fn can_transition_to(&self, next: &MissionStatus) -> bool {
        match (self, next) {
            (MissionStatus::InProgress, MissionStatus::Delivered) => true,
            (MissionStatus::InProgress, MissionStatus::Completed) => true,
            (MissionStatus::InProgress, MissionStatus::Failed(_)) => true,
            (MissionStatus::Delivered, MissionStatus::Completed) => true,
            (MissionStatus::Delivered, MissionStatus::Failed(_)) => true,
            // Terminal states cannot transition
            _ => false,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStatus::InProgress => f.write_str("IN_PROGRESS"),
            MissionStatus::Delivered => f.write_str("DELIVERED"),
            MissionStatus::Completed => f.write_str("COMPLETED"),
            MissionStatus::Failed(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

impl From<String> for MissionStatus {
    fn from(text: String) -> Self {
        match text.as_str() {
            "IN_PROGRESS" => MissionStatus::InProgress,
            "DELIVERED" => MissionStatus::Delivered,
            "COMPLETED" => MissionStatus::Completed,
            other => MissionStatus::Failed(
                other
                    .strip_prefix("FAILED: ")
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }
}

impl From<MissionStatus> for String {
    fn from(status: MissionStatus) -> Self {
        status.to_string()
    }
}

/// One mission attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub id: MissionId,
    pub drone_id: String,
    /// Delivery block, or `HOME` for return-home missions
    pub block: String,
    /// External order id supplied at launch
    pub order_ref: Option<String>,
    pub status: MissionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// SQLite-backed mission log
pub struct MissionStore {
    conn: Mutex<Connection>,
}

impl MissionStore {
    /// Open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening mission store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Volatile store, used by tests and demos
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS missions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                drone_id TEXT NOT NULL,
                block TEXT NOT NULL,
                order_ref TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_missions_drone ON missions(drone_id);
            "#,
        )?;
        Ok(())
    }

    /// Record a newly accepted mission as `IN_PROGRESS`
    pub fn create(&self, drone_id: &str, block: &str, order_ref: Option<&str>) -> Result<MissionId> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO missions (drone_id, block, order_ref, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                drone_id,
                block,
                order_ref,
                MissionStatus::InProgress.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(mission_id = id, drone_id, block, "mission recorded");
        Ok(id)
    }

    /// Fetch one record
    pub fn get(&self, id: MissionId) -> Result<MissionRecord> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, drone_id, block, order_ref, status, created_at, completed_at
             FROM missions WHERE id = ?1",
            [id],
            read_record,
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))
    }

    /// Most recent records first
    pub fn list(&self, limit: usize) -> Result<Vec<MissionRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, drone_id, block, order_ref, status, created_at, completed_at
             FROM missions ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map([limit as i64], read_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Payload release confirmed
    pub fn mark_delivered(&self, id: MissionId) -> Result<()> {
        self.transition(id, MissionStatus::Delivered)
    }

    /// Full round trip finished
    pub fn mark_completed(&self, id: MissionId) -> Result<()> {
        self.transition(id, MissionStatus::Completed)
    }

    /// Mission aborted with `reason`
    pub fn mark_failed(&self, id: MissionId, reason: &str) -> Result<()> {
        self.transition(id, MissionStatus::Failed(reason.to_string()))
    }

    fn transition(&self, id: MissionId, next: MissionStatus) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let current: MissionStatus = tx
            .query_row("SELECT status FROM missions WHERE id = ?1", [id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?
            .map(MissionStatus::from)
            .ok_or(StoreError::NotFound(id))?;

        if !current.can_transition_to(&next) {
            return Err(StoreError::InvalidTransition {
                id,
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let completed_at = next.is_terminal().then(|| Utc::now().to_rfc3339());
        tx.execute(
            "UPDATE missions SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![next.to_string(), completed_at, id],
        )?;
        tx.commit()?;

        debug!(mission_id = id, from = %current, to = %next, "mission status updated");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<MissionRecord> {
    let completed_at: Option<String> = row.get(6)?;
    Ok(MissionRecord {
        id: row.get(0)?,
        drone_id: row.get(1)?,
        block: row.get(2)?,
        order_ref: row.get(3)?,
        status: MissionStatus::from(row.get::<_, String>(4)?),
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
        completed_at: completed_at
            .map(|text| parse_timestamp(6, &text))
            .transpose()?,
    })
}

fn parse_timestamp(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}
