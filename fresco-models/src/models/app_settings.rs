//! Installation settings singleton.
//!
//! At most one row exists; the schema rejects a second insert with a
//! uniqueness violation. Updates still target every row so a store that
//! somehow holds duplicates stays consistent.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use fresco_core::error::{FrescoError, FrescoResult};

use super::{get_timestamp, to_timestamp, truncate_to_stored};

/// The persisted installation settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub id: i64,
    /// Becomes true once initial setup completes; only a reset clears it.
    pub configured: bool,
    /// Set when the row is created, never updated.
    pub initialized_at: DateTime<Utc>,
    pub allow_anonymous_recruitment: bool,
}

impl AppSettings {
    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            configured: row.get("configured")?,
            initialized_at: get_timestamp(row, "initialized_at")?,
            allow_anonymous_recruitment: row.get("allow_anonymous_recruitment")?,
        })
    }

    /// Read the singleton, if the installation has been initialized.
    pub fn find_first(conn: &Connection) -> FrescoResult<Option<Self>> {
        match conn.query_row(
            "SELECT id, configured, initialized_at, allow_anonymous_recruitment
             FROM app_settings ORDER BY id LIMIT 1",
            [],
            Self::from_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FrescoError::Database(e.to_string())),
        }
    }

    /// Insert the singleton. Fails if a row already exists.
    pub fn insert(conn: &Connection, initialized_at: DateTime<Utc>) -> FrescoResult<Self> {
        let initialized_at = truncate_to_stored(initialized_at);
        conn.execute(
            "INSERT INTO app_settings (initialized_at) VALUES (?1)",
            [to_timestamp(&initialized_at)],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;

        Ok(Self {
            id: conn.last_insert_rowid(),
            configured: false,
            initialized_at,
            allow_anonymous_recruitment: false,
        })
    }

    /// Set the anonymous recruitment flag on every row. Returns rows changed.
    pub fn update_anonymous_recruitment(conn: &Connection, allow: bool) -> FrescoResult<usize> {
        conn.execute(
            "UPDATE app_settings SET allow_anonymous_recruitment = ?1",
            params![allow],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Mark every row configured. Returns rows changed.
    pub fn set_configured(conn: &Connection) -> FrescoResult<usize> {
        conn.execute("UPDATE app_settings SET configured = 1", [])
            .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Delete every row. Returns rows removed.
    pub fn delete_all(conn: &Connection) -> FrescoResult<usize> {
        conn.execute("DELETE FROM app_settings", [])
            .map_err(|e| FrescoError::Database(e.to_string()))
    }
}
