//! Interview session entity model.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use fresco_core::error::{FrescoError, FrescoResult};

use super::participant::Participant;
use super::{get_json, get_opt_timestamp, get_timestamp, to_timestamp, truncate_to_stored};

/// One participant's run through one protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub finish_time: Option<DateTime<Utc>>,
    pub export_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    /// The collected network (nodes, edges, ego) as recorded by the interviewer.
    pub network: serde_json::Value,
    pub participant_id: String,
    pub protocol_id: String,
    pub current_step: i64,
}

/// An interview joined with its participant, the shape exports read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewWithParticipant {
    pub interview: Interview,
    pub participant: Participant,
}

impl Interview {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            start_time: get_timestamp(row, "start_time")?,
            finish_time: get_opt_timestamp(row, "finish_time")?,
            export_time: get_opt_timestamp(row, "export_time")?,
            last_updated: get_timestamp(row, "last_updated")?,
            network: get_json(row, "network")?,
            participant_id: row.get("participant_id")?,
            protocol_id: row.get("protocol_id")?,
            current_step: row.get("current_step")?,
        })
    }

    /// Start an interview.
    pub fn insert(
        conn: &Connection,
        participant_id: &str,
        protocol_id: &str,
        network: &serde_json::Value,
        start_time: DateTime<Utc>,
    ) -> FrescoResult<Self> {
        let start_time = truncate_to_stored(start_time);
        let interview = Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_time,
            finish_time: None,
            export_time: None,
            last_updated: start_time,
            network: network.clone(),
            participant_id: participant_id.to_string(),
            protocol_id: protocol_id.to_string(),
            current_step: 0,
        };
        conn.execute(
            "INSERT INTO interviews (id, start_time, last_updated, network, participant_id, protocol_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                interview.id,
                to_timestamp(&interview.start_time),
                to_timestamp(&interview.last_updated),
                interview.network.to_string(),
                interview.participant_id,
                interview.protocol_id,
            ],
        )
        .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(interview)
    }

    /// Record the finish time. Returns whether the interview exists.
    pub fn finish(conn: &Connection, id: &str, at: DateTime<Utc>) -> FrescoResult<bool> {
        let stamp = to_timestamp(&at);
        let changed = conn
            .execute(
                "UPDATE interviews SET finish_time = ?1, last_updated = ?1 WHERE id = ?2",
                params![stamp, id],
            )
            .map_err(|e| FrescoError::Database(e.to_string()))?;
        Ok(changed > 0)
    }

    /// Every interview with its participant, oldest first.
    pub fn list_with_participants(conn: &Connection) -> FrescoResult<Vec<InterviewWithParticipant>> {
        let mut stmt = conn
            .prepare(
                "SELECT i.*, p.id AS p_id, p.identifier AS p_identifier, p.label AS p_label
                 FROM interviews i JOIN participants p ON p.id = i.participant_id
                 ORDER BY i.start_time, i.id",
            )
            .map_err(|e| FrescoError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(InterviewWithParticipant {
                    interview: Self::from_row(row)?,
                    participant: Participant {
                        id: row.get("p_id")?,
                        identifier: row.get("p_identifier")?,
                        label: row.get("p_label")?,
                    },
                })
            })
            .map_err(|e| FrescoError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| FrescoError::Database(e.to_string()))
    }
}
