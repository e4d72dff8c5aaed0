//! CLI command implementations.

pub mod status;
pub mod settings;
pub mod users;
pub mod participants;
pub mod protocols;
pub mod interviews;
pub mod export;
pub mod db;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use fresco_models::Database;
use fresco_services::auth::{AuthProvider, RequestContext};
use fresco_services::ServiceRegistry;

/// Helper to initialize the database from config.
pub async fn init_database(config: &ConfigHandle) -> FrescoResult<Database> {
    let cfg = config.read().await;
    let db_path = cfg.effective_db_path()?;
    Database::init(&db_path, &cfg.database)
}

/// Open the database and bring up every service.
pub async fn init_services(config: &ConfigHandle) -> FrescoResult<ServiceRegistry> {
    let db = init_database(config).await?;
    let snapshot = config.snapshot().await;
    let mut registry = ServiceRegistry::new(config.clone(), db);
    registry.register_all(&snapshot)?;
    registry.init_all().await?;
    Ok(registry)
}

/// Resolve the `--session` token into a request context.
pub async fn request_context(
    registry: &ServiceRegistry,
    token: Option<&str>,
) -> FrescoResult<RequestContext> {
    let ctx = registry.auth().request_context(token).await?;
    if token.is_some() && ctx.session.is_none() {
        tracing::warn!("session token is unknown or expired");
    }
    Ok(ctx)
}

/// Table with the CLI's standard look.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> FrescoResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncate a string to at most `max_chars` characters, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
