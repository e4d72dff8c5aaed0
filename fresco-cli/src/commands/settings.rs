//! Installation settings commands.

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;

use fresco_core::config::ConfigHandle;
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_services::app_settings::MutationResult;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the installation settings and setup status.
    Show,
    /// Initialize the installation.
    Create,
    /// Mark initial setup as complete.
    Configure,
    /// Allow or forbid anonymous participant recruitment (requires --session).
    AnonymousRecruitment {
        /// true to allow, false to forbid.
        #[arg(action = clap::ArgAction::Set)]
        allow: bool,
    },
    /// Delete all installation data (development environments only).
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn run(
    config: ConfigHandle,
    action: SettingsAction,
    session: Option<&str>,
    format: OutputFormat,
) -> FrescoResult<()> {
    let registry = super::init_services(&config).await?;
    let service = registry.app_settings()?;

    match action {
        SettingsAction::Show => {
            let view = service.get().await?;
            let status = service.setup_status().await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({
                    "appSettings": view,
                    "status": status,
                }))?,
                OutputFormat::Text => {
                    println!("{}", style("Installation Settings").bold().underlined());
                    match view {
                        None => println!("  Not initialized. Run `fresco settings create`."),
                        Some(view) => {
                            let s = &view.settings;
                            println!("  Initialized:            {}", s.initialized_at.format("%Y-%m-%d %H:%M:%S UTC"));
                            println!("  Configured:             {}", yes_no(s.configured));
                            println!("  Anonymous recruitment:  {}", yes_no(s.allow_anonymous_recruitment));
                            if view.expired {
                                println!("  {}", style("Setup window expired; installation is locked.").red().bold());
                            }
                        }
                    }
                    println!("  Status:                 {status}");
                }
            }
        }
        SettingsAction::Create => {
            let result = service.create().await;
            report(&result, format, "Installation initialized.")?;
        }
        SettingsAction::Configure => {
            let result = service.set_configured().await;
            report(&result, format, "Installation configured.")?;
        }
        SettingsAction::AnonymousRecruitment { allow } => {
            let ctx = super::request_context(&registry, session).await?;
            let result = service.update_anonymous_recruitment(&ctx, allow).await?;
            let verb = if allow { "enabled" } else { "disabled" };
            report(&result, format, &format!("Anonymous recruitment {verb}."))?;
        }
        SettingsAction::Reset { yes } => {
            match reset_gate(yes, format) {
                ResetGate::Proceed => {}
                ResetGate::Prompt => {
                    let confirmed = Confirm::new()
                        .with_prompt("This deletes every user, participant, protocol and interview. Continue?")
                        .default(false)
                        .interact()
                        .map_err(|e| FrescoError::Internal(e.to_string()))?;
                    if !confirmed {
                        println!("  Reset cancelled.");
                        return Ok(());
                    }
                }
                ResetGate::Refuse => {
                    return Err(FrescoError::Config(
                        "settings reset with --format json needs --yes".into(),
                    ));
                }
            }
            let ctx = super::request_context(&registry, session).await?;
            let result = service.reset(&ctx).await?;
            report(&result, format, "Installation reset.")?;
        }
    }

    registry.shutdown_all().await
}

/// How a reset is confirmed before it runs.
#[derive(Debug, PartialEq, Eq)]
enum ResetGate {
    Proceed,
    Prompt,
    /// JSON output is for scripts, which cannot answer a prompt.
    Refuse,
}

fn reset_gate(yes: bool, format: OutputFormat) -> ResetGate {
    match (yes, format) {
        (true, _) => ResetGate::Proceed,
        (false, OutputFormat::Text) => ResetGate::Prompt,
        (false, OutputFormat::Json) => ResetGate::Refuse,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn report<T: serde::Serialize>(
    result: &MutationResult<T>,
    format: OutputFormat,
    success: &str,
) -> FrescoResult<()> {
    match format {
        OutputFormat::Json => super::print_json(result),
        OutputFormat::Text => {
            match &result.error {
                None => println!("  {} {success}", style("OK").green().bold()),
                Some(msg) => println!("  {} {msg}", style("FAIL").red().bold()),
            }
            Ok(())
        }
    }
}
