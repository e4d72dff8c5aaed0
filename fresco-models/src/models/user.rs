//! Researcher accounts and their login sessions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use fresco_core::error::{FrescoError, FrescoResult};

use super::{get_timestamp, to_timestamp, truncate_to_stored};

/// A researcher account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
        })
    }

    /// Create a user with a fresh id. Usernames are unique.
    pub fn insert(conn: &Connection, username: &str) -> FrescoResult<Self> {
        let user = Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
        };
        conn.execute(
            "INSERT INTO users (id, username) VALUES (?1, ?2)",
            params![user.id, user.username],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(user)
    }

    pub fn find_by_username(conn: &Connection, username: &str) -> FrescoResult<Option<Self>> {
        match conn.query_row(
            "SELECT * FROM users WHERE username = ?1",
            [username],
            Self::from_row,
        ) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FrescoError::Database(e.to_string())),
        }
    }

    pub fn list(conn: &Connection) -> FrescoResult<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT * FROM users ORDER BY username")
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Delete every user. Sessions and keys cascade.
    pub fn delete_all(conn: &Connection) -> FrescoResult<usize> {
        conn.execute("DELETE FROM users", [])
            .map_err(|e| FrescoError::Database(e.to_string()))
    }
}

/// A login session belonging to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    fn from_joined_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            expires_at: get_timestamp(row, "expires_at")?,
        })
    }

    /// Issue a session for `user` that expires at `expires_at`.
    pub fn insert(conn: &Connection, user: &User, expires_at: DateTime<Utc>) -> FrescoResult<Self> {
        let session = Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            expires_at: truncate_to_stored(expires_at),
        };
        conn.execute(
            "INSERT INTO user_sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.id, session.user_id, to_timestamp(&session.expires_at)],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(session)
    }

    /// Look up a session that has not expired as of `now`.
    pub fn find_valid(conn: &Connection, id: &str, now: DateTime<Utc>) -> FrescoResult<Option<Self>> {
        let found = match conn.query_row(
            "SELECT s.id, s.user_id, s.expires_at, u.username
             FROM user_sessions s JOIN users u ON u.id = s.user_id
             WHERE s.id = ?1",
            [id],
            Self::from_joined_row,
        ) {
            Ok(s) => Some(s),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(FrescoError::Database(e.to_string())),
        };
        Ok(found.filter(|s| s.expires_at > now))
    }

    /// Delete a session. Returns whether it existed.
    pub fn delete(conn: &Connection, id: &str) -> FrescoResult<bool> {
        let changed = conn
            .execute("DELETE FROM user_sessions WHERE id = ?1", [id])
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(changed > 0)
    }
}
