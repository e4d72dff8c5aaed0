//! Participant commands.

use clap::Subcommand;
use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use fresco_models::Participant;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ParticipantsAction {
    /// Add a participant.
    Add {
        /// Unique participant identifier.
        identifier: String,
        /// Optional display label.
        #[arg(short, long)]
        label: Option<String>,
    },
    /// List participants.
    List,
}

pub async fn run(
    config: ConfigHandle,
    action: ParticipantsAction,
    format: OutputFormat,
) -> FrescoResult<()> {
    let db = super::init_database(&config).await?;
    let conn = db.conn()?;

    match action {
        ParticipantsAction::Add { identifier, label } => {
            let participant = Participant::insert(&conn, &identifier, label.as_deref())?;
            match format {
                OutputFormat::Json => super::print_json(&participant)?,
                OutputFormat::Text => println!(
                    "  {} Added participant {}",
                    style("OK").green().bold(),
                    style(participant.display_label()).bold()
                ),
            }
        }
        ParticipantsAction::List => {
            let participants = Participant::list(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&participants)?,
                OutputFormat::Text => {
                    if participants.is_empty() {
                        println!("  No participants.");
                        return Ok(());
                    }
                    let mut table = super::new_table();
                    table.set_header(vec!["Identifier", "Label", "ID"]);
                    for p in &participants {
                        table.add_row(vec![
                            p.identifier.clone(),
                            p.label.clone().unwrap_or_default(),
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
