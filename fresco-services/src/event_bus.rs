//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels to decouple services from one another.
//! Services emit events without knowing who is listening; front ends
//! (the CLI progress bar, cache observers) subscribe independently.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Application-level state changes other components care about.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A cache tag was invalidated; readers will reload on next access.
    CacheRevalidated {
        tag: String,
    },
    /// The installation settings singleton was created.
    AppSettingsCreated,
    /// Initial setup completed.
    InstallationConfigured,
    /// All installation data was deleted.
    InstallationReset,
    /// A user session was invalidated.
    SessionSignedOut {
        session_id: String,
    },
    /// An export job was handed to the export engine.
    ExportStarted {
        session_count: usize,
    },
    /// Progress reported by a running export job.
    ExportProgress {
        status_text: String,
        progress: u8,
    },
    /// One interview session was written by the export engine.
    SessionExported {
        session_id: String,
    },
    /// An export job completed successfully.
    ExportFinished {
        name: String,
        size: u64,
    },
    /// An export job failed.
    ExportFailed {
        message: String,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Subscribers that fall behind
/// receive `Lagged` and miss events, which is acceptable for progress
/// display and cache observers.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::CacheRevalidated { .. } => "CacheRevalidated",
        AppEvent::AppSettingsCreated => "AppSettingsCreated",
        AppEvent::InstallationConfigured => "InstallationConfigured",
        AppEvent::InstallationReset => "InstallationReset",
        AppEvent::SessionSignedOut { .. } => "SessionSignedOut",
        AppEvent::ExportStarted { .. } => "ExportStarted",
        AppEvent::ExportProgress { .. } => "ExportProgress",
        AppEvent::SessionExported { .. } => "SessionExported",
        AppEvent::ExportFinished { .. } => "ExportFinished",
        AppEvent::ExportFailed { .. } => "ExportFailed",
    }
}
