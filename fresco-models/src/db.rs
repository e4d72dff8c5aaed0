//! The SQLite store behind every Fresco record.
//!
//! One pooled file database. Every pooled connection has foreign keys on,
//! which the reset cascades rely on.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{error, info};

use fresco_core::error::{FrescoError, FrescoResult};
use fresco_core::config::DatabaseConfig;

use crate::schema;
use crate::migrations;

/// Pool of SQLite connections.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection handed out by [`Database::conn`].
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Cheaply cloneable handle to the store.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Open (or create) the store at `db_path`, bring its schema up to date
    /// and return a pooled handle. Fails on a corrupt file when the startup
    /// integrity check is enabled.
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> FrescoResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("opening store at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| FrescoError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let conn = db.conn()?;
            schema::create_tables(&conn)?;
            migrations::run_migrations(&conn)?;
        }

        info!("store ready");
        Ok(db)
    }

    /// Borrow a pooled connection.
    pub fn conn(&self) -> FrescoResult<DbConn> {
        self.pool.get().map_err(|e| FrescoError::Pool(e.to_string()))
    }

    /// `PRAGMA integrity_check`; anything but `ok` is an error.
    pub fn run_integrity_check(&self) -> FrescoResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| FrescoError::Database(e.to_string()))?;

        if result != "ok" {
            error!("store failed integrity check: {result}");
            return Err(FrescoError::IntegrityCheck(result));
        }

        info!("store integrity ok");
        Ok(())
    }

    /// Run `f` in a transaction, committing only if it returns `Ok`.
    pub fn transaction<T, F>(&self, f: F) -> FrescoResult<T>
    where
        F: FnOnce(&Connection) -> FrescoResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| FrescoError::Database(e.to_string()))?;

        let result = f(&tx)?;

        tx.commit()
            .map_err(|e| FrescoError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Row counts per table.
    pub fn stats(&self) -> FrescoResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |table: &str| -> FrescoResult<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(|e| FrescoError::Database(e.to_string()))
        };

        Ok(DatabaseStats {
            app_settings: count("app_settings")?,
            users: count("users")?,
            sessions: count("user_sessions")?,
            participants: count("participants")?,
            protocols: count("protocols")?,
            interviews: count("interviews")?,
        })
    }
}

/// Database row count statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DatabaseStats {
    pub app_settings: i64,
    pub users: i64,
    pub sessions: i64,
    pub participants: i64,
    pub protocols: i64,
    pub interviews: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "app_settings={}, users={}, sessions={}, participants={}, protocols={}, interviews={}",
            self.app_settings, self.users, self.sessions, self.participants, self.protocols,
            self.interviews
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        // Cascading deletes depend on foreign_keys being on for every connection.
        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }
}
