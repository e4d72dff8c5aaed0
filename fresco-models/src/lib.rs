//! Fresco Models - Database schema, models, and migrations.
//!
//! This crate owns all data persistence: SQLite database initialization,
//! the installation settings singleton, researcher accounts and sessions,
//! participants, protocols, interviews, and versioned migrations.

pub mod db;
pub mod schema;
pub mod models;
pub mod migrations;

// Re-export key types
pub use db::{Database, DatabaseStats, DbConn, DbPool};
pub use models::app_settings::AppSettings;
pub use models::user::{User, UserSession};
pub use models::participant::Participant;
pub use models::protocol::{Protocol, ProtocolDocument};
pub use models::interview::{Interview, InterviewWithParticipant};
