//! Export command - export every interview session with live progress.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;

use fresco_core::config::ConfigHandle;
use fresco_core::error::FrescoResult;
use fresco_services::event_bus::AppEvent;
use fresco_services::export::ExportResult;
use crate::OutputFormat;

pub async fn run(config: ConfigHandle, session: Option<&str>, format: OutputFormat) -> FrescoResult<()> {
    let registry = super::init_services(&config).await?;
    let ctx = super::request_context(&registry, session).await?;
    let service = registry.export()?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Exporting [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    if matches!(format, OutputFormat::Json) {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut events = registry.event_bus().subscribe();
    let pb_events = pb.clone();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AppEvent::ExportProgress { status_text, progress }) => {
                    pb_events.set_position(u64::from(progress));
                    pb_events.set_message(status_text);
                }
                Ok(AppEvent::SessionExported { session_id }) => {
                    pb_events.println(format!("  {} {session_id}", style("exported").dim()));
                }
                Ok(AppEvent::ExportFinished { .. }) | Ok(AppEvent::ExportFailed { .. }) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = service.export_sessions(&ctx).await;
    // Unauthenticated exports never reach the engine, so no terminal event arrives.
    if outcome.is_err() {
        renderer.abort();
    } else if let Err(e) = renderer.await {
        tracing::debug!("progress renderer ended early: {e}");
    }
    pb.finish_and_clear();

    let result = outcome?;
    match format {
        OutputFormat::Json => super::print_json(&result.to_response())?,
        OutputFormat::Text => match &result {
            ExportResult::Success { data, message } => {
                println!("  {} {message}", style("OK").green().bold());
                println!("  File: {} ({})", data.name, super::format_bytes(data.size));
                println!("  URL:  {}", data.url);
            }
            ExportResult::Failure { message, error } => {
                println!("  {} {message}", style("FAIL").red().bold());
                tracing::debug!("export failure cause: {error}");
            }
        },
    }

    registry.shutdown_all().await
}
