//! Database management commands.

use clap::Subcommand;
use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Show the database file path.
    Path,
}

pub async fn run(config: ConfigHandle, action: DbAction, format: OutputFormat) -> FrescoResult<()> {
    let db_path = config.read().await.effective_db_path()?;

    match action {
        DbAction::Stats => {
            let db = super::init_database(&config).await?;
            let stats = db.stats()?;
            let file_size = std::fs::metadata(&db_path).ok().map(|m| m.len());

            let conn = db.conn()?;
            let journal_mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_else(|_| "unknown".to_string());

            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({
                    "path": db_path.display().to_string(),
                    "tables": stats,
                    "file_size_bytes": file_size,
                    "journal_mode": journal_mode,
                }))?,
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:          {}", db_path.display());
                    println!("  Journal mode:  {}", journal_mode);
                    if let Some(size) = file_size {
                        println!("  Size:          {}", super::format_bytes(size));
                    }
                    println!();

                    let mut table = super::new_table();
                    table.set_header(vec!["Table", "Row Count"]);
                    table.add_row(vec!["app_settings".to_string(), stats.app_settings.to_string()]);
                    table.add_row(vec!["users".to_string(), stats.users.to_string()]);
                    table.add_row(vec!["user_sessions".to_string(), stats.sessions.to_string()]);
                    table.add_row(vec!["participants".to_string(), stats.participants.to_string()]);
                    table.add_row(vec!["protocols".to_string(), stats.protocols.to_string()]);
                    table.add_row(vec!["interviews".to_string(), stats.interviews.to_string()]);
                    println!("{table}");
                }
            }
        }
        DbAction::Check => {
            println!("  {} Running integrity check...", style("...").dim());
            let db = super::init_database(&config).await?;

            match db.run_integrity_check() {
                Ok(()) => println!("  {} Integrity check passed.", style("OK").green().bold()),
                Err(e) => println!("  {} Integrity check failed: {e}", style("FAIL").red().bold()),
            }

            let conn = db.conn()?;
            let violations: i64 = conn
                .query_row("SELECT COUNT(*) FROM pragma_foreign_key_check", [], |row| row.get(0))
                .unwrap_or(0);
            if violations == 0 {
                println!("  {} No foreign key violations.", style("OK").green().bold());
            } else {
                println!(
                    "  {} {violations} foreign key violation(s).",
                    style("WARN").yellow().bold()
                );
            }
        }
        DbAction::Path => match format {
            OutputFormat::Json => super::print_json(&serde_json::json!({
                "path": db_path.display().to_string(),
                "exists": db_path.exists(),
            }))?,
            OutputFormat::Text => println!("{}", db_path.display()),
        },
    }

    Ok(())
}
