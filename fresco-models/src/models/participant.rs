//! Interview participant entity model.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use fresco_core::error::{FrescoError, FrescoResult};

/// A person who can be interviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Researcher-assigned identifier, unique per installation.
    pub identifier: String,
    pub label: Option<String>,
}

impl Participant {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            identifier: row.get("identifier")?,
            label: row.get("label")?,
        })
    }

    pub fn insert(conn: &Connection, identifier: &str, label: Option<&str>) -> FrescoResult<Self> {
        let participant = Self {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            label: label.map(String::from),
        };
        conn.execute(
            "INSERT INTO participants (id, identifier, label) VALUES (?1, ?2, ?3)",
            params![participant.id, participant.identifier, participant.label],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(participant)
    }

    pub fn find_by_identifier(conn: &Connection, identifier: &str) -> FrescoResult<Option<Self>> {
        match conn.query_row(
            "SELECT * FROM participants WHERE identifier = ?1",
            [identifier],
            Self::from_row,
        ) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FrescoError::Database(e.to_string())),
        }
    }

    pub fn list(conn: &Connection) -> FrescoResult<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT * FROM participants ORDER BY identifier")
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Delete every participant. Their interviews cascade.
    pub fn delete_all(conn: &Connection) -> FrescoResult<usize> {
        conn.execute("DELETE FROM participants", [])
            .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Label if set, otherwise the identifier.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.identifier)
    }
}
