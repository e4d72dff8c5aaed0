//! Fresco Services - installation lifecycle and export orchestration.
//!
//! This crate provides the service trait, the service registry, and the
//! concrete services:
//! - AppSettings lifecycle (create, configure, anonymous recruitment, reset)
//! - Unconfigured-installation expiry policy and setup gate
//! - Session resolution and sign-out
//! - Interview export orchestration over a pluggable export engine
//! - Session/protocol reformatting for the export engine
//! - Best-effort telemetry
//! - Tag cache and typed event bus

pub mod service;
pub mod registry;
pub mod event_bus;
pub mod cache;
pub mod expiry;
pub mod auth;
pub mod app_settings;
pub mod formatter;
pub mod export_engine;
pub mod telemetry;
pub mod export;

// Re-export key types
pub use service::{Service, ServiceState};
pub use registry::ServiceRegistry;
pub use event_bus::{AppEvent, EventBus};
pub use cache::TagCache;
pub use expiry::is_expired;
pub use auth::{AuthProvider, DatabaseAuthProvider, RequestContext, Session};
pub use app_settings::{AppSettingsService, AppSettingsView, MutationResult, SetupStatus, UpdateCount};
pub use formatter::{format_exportable_sessions, reindex_protocols, remote_protocol_id, ExportableSession};
pub use export_engine::{
    ExportEngine, ExportEvent, ExportJob, ExportOutput, FileExportEngine, JobPhase, ProgressSender,
    UploadData,
};
pub use telemetry::{telemetry_from_config, Telemetry, TelemetryEvent, TelemetryEventType};
pub use export::{DatabaseExportSource, ExportDataSource, ExportResponse, ExportResult, ExportService};
