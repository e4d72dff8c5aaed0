//! Status command - show installation, database and service health.

use console::style;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use fresco_core::platform::Platform;
use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> FrescoResult<()> {
    let cfg = config.snapshot().await;
    let registry = super::init_services(&config).await?;
    let service = registry.app_settings()?;

    let setup = service.setup_status().await?;
    let settings = service.get().await?;
    let stats = registry.database.stats()?;
    let health = registry.health_check().await;

    match format {
        OutputFormat::Json => {
            let services: Vec<_> = health
                .iter()
                .map(|(name, state, healthy)| {
                    serde_json::json!({"name": name, "state": state.to_string(), "healthy": healthy})
                })
                .collect();
            super::print_json(&serde_json::json!({
                "environment": cfg.environment,
                "platform": Platform::current().name(),
                "setup_status": setup,
                "app_settings": settings,
                "database": stats,
                "telemetry_enabled": cfg.is_telemetry_enabled(),
                "services": services,
            }))?;
        }
        OutputFormat::Text => {
            println!("{}", style("Fresco Status").bold().underlined());
            println!("  Environment:   {:?}", cfg.environment);
            println!("  Platform:      {}", Platform::current().name());
            let setup_text = match setup {
                fresco_services::SetupStatus::Configured => style(setup.to_string()).green(),
                fresco_services::SetupStatus::Expired => style(setup.to_string()).red(),
                _ => style(setup.to_string()).yellow(),
            };
            println!("  Setup:         {setup_text}");
            if let Some(view) = &settings {
                println!(
                    "  Anonymous recruitment: {}",
                    if view.settings.allow_anonymous_recruitment { "on" } else { "off" }
                );
            }
            println!("  Telemetry:     {}", if cfg.is_telemetry_enabled() { "http" } else { "log only" });
            println!("  Data:          {stats}");
            println!();

            let mut table = super::new_table();
            table.set_header(vec!["Service", "State", "Healthy"]);
            for (name, state, healthy) in &health {
                table.add_row(vec![
                    name.clone(),
                    state.to_string(),
                    (if *healthy { "yes" } else { "no" }).to_string(),
                ]);
            }
            println!("{table}");
        }
    }

    registry.shutdown_all().await
}
