//! Installed interview protocol entity model.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use fresco_core::error::{FrescoError, FrescoResult};

use super::{get_json, get_timestamp, to_timestamp, truncate_to_stored};

/// A protocol as found in an uploaded `protocol.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDocument {
    /// Absent in most protocol files; the importer falls back to the file name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub schema_version: i64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default = "empty_array")]
    pub stages: serde_json::Value,
    #[serde(default = "empty_object")]
    pub codebook: serde_json::Value,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// An installed protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: String,
    /// Hash of the imported file; a protocol can only be installed once.
    pub hash: String,
    pub name: String,
    pub schema_version: i64,
    pub description: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub stages: serde_json::Value,
    pub codebook: serde_json::Value,
    pub active: bool,
}

impl Protocol {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            hash: row.get("hash")?,
            name: row.get("name")?,
            schema_version: row.get("schema_version")?,
            description: row.get("description")?,
            imported_at: get_timestamp(row, "imported_at")?,
            last_modified: get_timestamp(row, "last_modified")?,
            stages: get_json(row, "stages")?,
            codebook: get_json(row, "codebook")?,
            active: row.get("active")?,
        })
    }

    /// Install a protocol document under `name`.
    pub fn insert(
        conn: &Connection,
        name: &str,
        document: &ProtocolDocument,
        hash: &str,
        imported_at: DateTime<Utc>,
    ) -> FrescoResult<Self> {
        let imported_at = truncate_to_stored(imported_at);
        let protocol = Self {
            id: uuid::Uuid::new_v4().to_string(),
            hash: hash.to_string(),
            name: name.to_string(),
            schema_version: document.schema_version,
            description: document.description.clone(),
            imported_at,
            last_modified: truncate_to_stored(document.last_modified.unwrap_or(imported_at)),
            stages: document.stages.clone(),
            codebook: document.codebook.clone(),
            active: false,
        };

        conn.execute(
            "INSERT INTO protocols
                (id, hash, name, schema_version, description, imported_at, last_modified, stages, codebook, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                protocol.id,
                protocol.hash,
                protocol.name,
                protocol.schema_version,
                protocol.description,
                to_timestamp(&protocol.imported_at),
                to_timestamp(&protocol.last_modified),
                protocol.stages.to_string(),
                protocol.codebook.to_string(),
                protocol.active,
            ],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;

        Ok(protocol)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> FrescoResult<Option<Self>> {
        match conn.query_row("SELECT * FROM protocols WHERE id = ?1", [id], Self::from_row) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FrescoError::Database(e.to_string())),
        }
    }

    /// All installed protocols, oldest import first.
    pub fn list(conn: &Connection) -> FrescoResult<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT * FROM protocols ORDER BY imported_at, name")
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| FrescoError::Database(e.to_string()))
    }

    /// Delete every protocol. Their interviews cascade.
    pub fn delete_all(conn: &Connection) -> FrescoResult<usize> {
        conn.execute("DELETE FROM protocols", [])
            .map_err(|e| FrescoError::Database(e.to_string()))
    }
}
