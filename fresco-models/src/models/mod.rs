//! Entity models and their SQLite finders.

pub mod app_settings;
pub mod user;
pub mod participant;
pub mod protocol;
pub mod interview;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// Render a timestamp the way every TEXT time column stores it.
pub(crate) fn to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop precision the TEXT columns cannot hold, so returned records
/// compare equal to what a later read yields.
pub(crate) fn truncate_to_stored(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(3)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a required RFC 3339 column.
pub(crate) fn get_timestamp(row: &Row<'_>, col: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(col)?;
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

/// Read a nullable RFC 3339 column.
pub(crate) fn get_opt_timestamp(row: &Row<'_>, col: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(col)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_timestamp(idx, &r)).transpose()
}

/// Read a JSON document stored as TEXT.
pub(crate) fn get_json(row: &Row<'_>, col: &str) -> rusqlite::Result<serde_json::Value> {
    let idx = row.as_ref().column_index(col)?;
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
