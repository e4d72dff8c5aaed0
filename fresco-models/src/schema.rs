//! Database schema definitions and table creation.
//!
//! Cascade rules live here rather than in the services: deleting a user
//! removes its sessions and keys, deleting a participant or a protocol
//! removes the interviews that reference it.

use rusqlite::Connection;
use fresco_core::error::{FrescoError, FrescoResult};
use tracing::info;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> FrescoResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| FrescoError::Database(format!("failed to create schema: {e}")))?;
    info!("database schema verified");
    Ok(())
}

/// Complete SQL schema for all tables.
const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Installation settings. The singleton column makes a second row a
-- uniqueness violation.
CREATE TABLE IF NOT EXISTS app_settings (
    id                              INTEGER PRIMARY KEY AUTOINCREMENT,
    singleton                       INTEGER NOT NULL DEFAULT 1 UNIQUE CHECK (singleton = 1),
    configured                      INTEGER NOT NULL DEFAULT 0,
    initialized_at                  TEXT NOT NULL,
    allow_anonymous_recruitment     INTEGER NOT NULL DEFAULT 0
);

-- Researcher accounts
CREATE TABLE IF NOT EXISTS users (
    id                              TEXT PRIMARY KEY,
    username                        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS user_sessions (
    id                              TEXT PRIMARY KEY,
    user_id                         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at                      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_sessions_user_id ON user_sessions(user_id);

CREATE TABLE IF NOT EXISTS user_keys (
    id                              TEXT PRIMARY KEY,
    user_id                         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    hashed_password                 TEXT
);

-- Interview participants
CREATE TABLE IF NOT EXISTS participants (
    id                              TEXT PRIMARY KEY,
    identifier                      TEXT NOT NULL UNIQUE,
    label                           TEXT
);

-- Installed protocols
CREATE TABLE IF NOT EXISTS protocols (
    id                              TEXT PRIMARY KEY,
    hash                            TEXT NOT NULL UNIQUE,
    name                            TEXT NOT NULL,
    schema_version                  INTEGER NOT NULL,
    description                     TEXT,
    imported_at                     TEXT NOT NULL,
    last_modified                   TEXT NOT NULL,
    stages                          TEXT NOT NULL DEFAULT '[]',
    codebook                        TEXT NOT NULL DEFAULT '{}',
    active                          INTEGER NOT NULL DEFAULT 0
);

-- Interview sessions
CREATE TABLE IF NOT EXISTS interviews (
    id                              TEXT PRIMARY KEY,
    start_time                      TEXT NOT NULL,
    finish_time                     TEXT,
    export_time                     TEXT,
    last_updated                    TEXT NOT NULL,
    network                         TEXT NOT NULL DEFAULT '{}',
    participant_id                  TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
    protocol_id                     TEXT NOT NULL REFERENCES protocols(id) ON DELETE CASCADE,
    current_step                    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_interviews_participant_id ON interviews(participant_id);
"#;
