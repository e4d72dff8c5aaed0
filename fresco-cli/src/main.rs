//! Fresco CLI - command-line front end for a Fresco installation.
//!
//! Drives the installation lifecycle (initialize, configure, reset),
//! manages researchers, participants, protocols and interviews, and runs
//! interview exports from the terminal.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use fresco_core::config::{AppConfig, ConfigHandle};
use fresco_core::error::FrescoResult;
use fresco_core::logging;

/// Fresco - network interview data collection.
#[derive(Parser)]
#[command(
    name = "fresco",
    version,
    about = "Fresco installation management CLI",
    long_about = "A command-line interface for a Fresco installation.\n\
                   Set up the installation, manage protocols and participants, and export interview data."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Session token for commands that require a logged-in researcher.
    #[arg(short, long, global = true, env = "FRESCO_SESSION")]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show installation, database and service status.
    Status,
    /// Inspect and change installation settings.
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Manage researcher accounts.
    Users {
        #[command(subcommand)]
        action: commands::users::UsersAction,
    },
    /// Manage participants.
    Participants {
        #[command(subcommand)]
        action: commands::participants::ParticipantsAction,
    },
    /// Import and list protocols.
    Protocols {
        #[command(subcommand)]
        action: commands::protocols::ProtocolsAction,
    },
    /// Start and list interviews.
    Interviews {
        #[command(subcommand)]
        action: commands::interviews::InterviewsAction,
    },
    /// Export every interview session.
    Export,
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
}

#[tokio::main]
async fn main() -> FrescoResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };

    // Initialize logging
    let log_dir = config.effective_log_dir()?;
    let _guard = if cli.verbose {
        logging::init_logging("debug", &log_dir, config.logging.json_output)?
    } else {
        logging::init_from_config(&config.logging, &log_dir)?
    };

    let config_handle = ConfigHandle::new(config);

    info!("Fresco CLI v{}", fresco_core::constants::APP_VERSION);

    let session = cli.session.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Status => commands::status::run(config_handle, cli.format).await,
        Commands::Settings { action } => {
            commands::settings::run(config_handle, action, session, cli.format).await
        }
        Commands::Users { action } => {
            commands::users::run(config_handle, action, cli.format).await
        }
        Commands::Participants { action } => {
            commands::participants::run(config_handle, action, cli.format).await
        }
        Commands::Protocols { action } => {
            commands::protocols::run(config_handle, action, cli.format).await
        }
        Commands::Interviews { action } => {
            commands::interviews::run(config_handle, action, cli.format).await
        }
        Commands::Export => commands::export::run(config_handle, session, cli.format).await,
        Commands::Db { action } => commands::db::run(config_handle, action, cli.format).await,
    }
}
