//! Interview commands.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{Interview, Participant, Protocol};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum InterviewsAction {
    /// Start an interview for a participant on a protocol.
    Start {
        /// Participant identifier.
        participant: String,
        /// Protocol ID.
        protocol_id: String,
        /// JSON file holding the collected network.
        #[arg(short, long)]
        network: Option<PathBuf>,
    },
    /// Mark an interview as finished.
    Finish {
        /// Interview ID.
        id: String,
    },
    /// List interviews.
    List,
}

pub async fn run(config: ConfigHandle, action: InterviewsAction, format: OutputFormat) -> FrescoResult<()> {
    let db = super::init_database(&config).await?;
    let conn = db.conn()?;

    match action {
        InterviewsAction::Start { participant, protocol_id, network } => {
            let participant = Participant::find_by_identifier(&conn, &participant)?.ok_or(
                FrescoError::NotFound { entity: "participant", id: participant },
            )?;
            let protocol = Protocol::find_by_id(&conn, &protocol_id)?.ok_or(
                FrescoError::NotFound { entity: "protocol", id: protocol_id },
            )?;
            let network = match network {
                Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
                None => serde_json::json!({"nodes": [], "edges": [], "ego": {}}),
            };

            let interview = Interview::insert(&conn, &participant.id, &protocol.id, &network, Utc::now())?;
            match format {
                OutputFormat::Json => super::print_json(&interview)?,
                OutputFormat::Text => println!(
                    "  {} Started interview {} for {} on {}",
                    style("OK").green().bold(),
                    interview.id,
                    style(participant.display_label()).bold(),
                    protocol.name
                ),
            }
        }
        InterviewsAction::Finish { id } => {
            if !Interview::finish(&conn, &id, Utc::now())? {
                return Err(FrescoError::NotFound { entity: "interview", id });
            }
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({"id": id, "finished": true}))?,
                OutputFormat::Text => println!("  {} Finished interview {id}", style("OK").green().bold()),
            }
        }
        InterviewsAction::List => {
            let interviews = Interview::list_with_participants(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&interviews)?,
                OutputFormat::Text => {
                    if interviews.is_empty() {
                        println!("  No interviews.");
                        return Ok(());
                    }
                    let mut table = super::new_table();
                    table.set_header(vec!["Participant", "Started", "Finished", "Step", "ID"]);
                    for row in &interviews {
                        let i = &row.interview;
                        table.add_row(vec![
                            row.participant.display_label().to_string(),
                            i.start_time.format("%Y-%m-%d %H:%M").to_string(),
                            i.finish_time
                                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "-".into()),
                            i.current_step.to_string(),
                            i.id.clone(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
    }
    Ok(())
}
