//! Versioned database migrations.
//!
//! Migrations run sequentially from the current stored version to the latest.
//! Each migration is idempotent.

use rusqlite::Connection;
use tracing::{info, warn};
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_core::constants::DB_SCHEMA_VERSION;

/// Run all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> FrescoResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= DB_SCHEMA_VERSION {
        info!("database schema is up to date (version {current_version})");
        return Ok(());
    }

    info!("running migrations from version {current_version} to {DB_SCHEMA_VERSION}");

    for version in (current_version + 1)..=DB_SCHEMA_VERSION {
        run_migration(conn, version)?;
    }

    set_schema_version(conn, DB_SCHEMA_VERSION)?;
    info!("migrations complete, schema at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> FrescoResult<i32> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| FrescoError::Migration(e.to_string()))?;

    if count == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .map_err(|e| FrescoError::Migration(e.to_string()))?;
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })
    .map_err(|e| FrescoError::Migration(e.to_string()))
}

fn set_schema_version(conn: &Connection, version: i32) -> FrescoResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(|e| FrescoError::Migration(e.to_string()))?;
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> FrescoResult<()> {
    info!("applying migration version {version}");

    match version {
        1 => migration_v1(conn),
        2 => migration_v2(conn),
        _ => {
            warn!("unknown migration version {version}, skipping");
            Ok(())
        }
    }
}

/// Migration v1: baseline. Tables come from schema::create_tables; this only
/// clears sessions left over from a store that predates expiry tracking.
fn migration_v1(conn: &Connection) -> FrescoResult<()> {
    let removed = conn
        .execute("DELETE FROM user_sessions WHERE expires_at = ''", [])
        .map_err(|e| FrescoError::Migration(e.to_string()))?;
    if removed > 0 {
        info!("removed {removed} session(s) without an expiry");
    }
    Ok(())
}

/// Migration v2: index interviews by protocol for the protocol cascade and
/// the export join.
fn migration_v2(conn: &Connection) -> FrescoResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_interviews_protocol_id ON interviews(protocol_id);",
    )
    .map_err(|e| FrescoError::Migration(e.to_string()))?;
    Ok(())
}
