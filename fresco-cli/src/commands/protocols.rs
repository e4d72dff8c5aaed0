//! Protocol commands.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{Protocol, ProtocolDocument};
use fresco_services::formatter::{content_hash, remote_protocol_id};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ProtocolsAction {
    /// Install a protocol from a protocol.json file.
    Import {
        file: PathBuf,
    },
    /// List installed protocols.
    List,
}

pub async fn run(config: ConfigHandle, action: ProtocolsAction, format: OutputFormat) -> FrescoResult<()> {
    let db = super::init_database(&config).await?;
    let conn = db.conn()?;

    match action {
        ProtocolsAction::Import { file } => {
            let bytes = std::fs::read(&file)?;
            let document: ProtocolDocument = serde_json::from_slice(&bytes)?;
            let name = match &document.name {
                Some(name) => name.clone(),
                None => file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| FrescoError::Config(format!("cannot name protocol from {}", file.display())))?,
            };

            let protocol = Protocol::insert(&conn, &name, &document, &content_hash(&bytes), Utc::now())?;
            match format {
                OutputFormat::Json => super::print_json(&protocol)?,
                OutputFormat::Text => {
                    println!("  {} Imported {}", style("OK").green().bold(), style(&protocol.name).bold());
                    println!("  ID:        {}", protocol.id);
                    println!("  Remote ID: {}", remote_protocol_id(&protocol.name));
                }
            }
        }
        ProtocolsAction::List => {
            let protocols = Protocol::list(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&protocols)?,
                OutputFormat::Text => {
                    if protocols.is_empty() {
                        println!("  No protocols installed.");
                        return Ok(());
                    }
                    let mut table = super::new_table();
                    table.set_header(vec!["Name", "Schema", "Imported", "Description", "ID"]);
                    for p in &protocols {
                        table.add_row(vec![
                            p.name.clone(),
                            p.schema_version.to_string(),
                            p.imported_at.format("%Y-%m-%d").to_string(),
                            super::truncate(p.description.as_deref().unwrap_or(""), 40),
                            p.id.clone(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
    }
    Ok(())
}
