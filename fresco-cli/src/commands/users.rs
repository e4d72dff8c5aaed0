//! Researcher account commands.

use clap::Subcommand;
use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use fresco_models::User;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum UsersAction {
    /// Create an account and print a session token for it.
    Signup {
        username: String,
    },
    /// List accounts.
    List,
}

pub async fn run(config: ConfigHandle, action: UsersAction, format: OutputFormat) -> FrescoResult<()> {
    match action {
        UsersAction::Signup { username } => {
            let registry = super::init_services(&config).await?;
            let session = registry.auth().sign_up(&username)?;
            match format {
                OutputFormat::Json => super::print_json(&session)?,
                OutputFormat::Text => {
                    println!("  {} Created {}", style("OK").green().bold(), style(&session.username).bold());
                    println!("  Session token: {}", session.id);
                    println!("  Expires:       {}", session.expires_at.format("%Y-%m-%d"));
                    println!("  Pass it with --session or FRESCO_SESSION.");
                }
            }
            registry.shutdown_all().await?;
        }
        UsersAction::List => {
            let db = super::init_database(&config).await?;
            let conn = db.conn()?;
            let users = User::list(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&users)?,
                OutputFormat::Text => {
                    if users.is_empty() {
                        println!("  No users.");
                        return Ok(());
                    }
                    let mut table = super::new_table();
                    table.set_header(vec!["Username", "ID"]);
                    for user in &users {
                        table.add_row(vec![user.username.clone(), user.id.clone()]);
                    }
                    println!("{table}");
                }
            }
        }
    }
    Ok(())
}
