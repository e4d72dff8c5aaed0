//! Interview session export orchestration.
//!
//! Reads every interview and installed protocol, reshapes them for the
//! export engine, runs one export job while observing its events, and
//! reports the outcome to telemetry. The steps run strictly in sequence;
//! the only concurrency is the event observer running alongside the job.
//!
//! A missing session is the one failure returned as `Err`. Anything that
//! goes wrong after that (reads, job preparation, the job itself) is
//! logged, tracked once as an `Error` event, and returned as
//! [`ExportResult::Failure`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use fresco_core::constants::{messages, INTERVIEWS_PATH};
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{Database, Interview, InterviewWithParticipant, Protocol};

use crate::auth::RequestContext;
use crate::event_bus::{AppEvent, EventBus};
use crate::export_engine::{ExportEngine, ExportEvent, ExportOutput, ProgressSender, UploadData};
use crate::formatter::{format_exportable_sessions, reindex_protocols};
use crate::service::{Service, ServiceState};
use crate::telemetry::{ErrorDetails, Telemetry, TelemetryEvent};

/// Bulk reads the export needs.
#[async_trait]
pub trait ExportDataSource: Send + Sync {
    async fn interviews(&self) -> FrescoResult<Vec<InterviewWithParticipant>>;
    async fn protocols(&self) -> FrescoResult<Vec<Protocol>>;
}

/// Reads interviews and protocols from the local database.
#[derive(Clone)]
pub struct DatabaseExportSource {
    database: Database,
}

impl DatabaseExportSource {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl ExportDataSource for DatabaseExportSource {
    async fn interviews(&self) -> FrescoResult<Vec<InterviewWithParticipant>> {
        let conn = self.database.conn()?;
        Interview::list_with_participants(&conn)
    }

    async fn protocols(&self) -> FrescoResult<Vec<Protocol>> {
        let conn = self.database.conn()?;
        Protocol::list(&conn)
    }
}

/// Outcome of an export request.
#[derive(Debug)]
pub enum ExportResult {
    Success { data: UploadData, message: String },
    /// `error` is kept for diagnostics; users only see `message`.
    Failure { message: String, error: FrescoError },
}

/// Uniform `{data, error, message}` response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub data: Option<UploadData>,
    pub error: Option<String>,
    pub message: String,
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Failure { message, .. } => message,
        }
    }

    pub fn to_response(&self) -> ExportResponse {
        match self {
            Self::Success { data, message } => ExportResponse {
                data: Some(data.clone()),
                error: None,
                message: message.clone(),
            },
            Self::Failure { message, error } => ExportResponse {
                data: None,
                error: Some(error.to_string()),
                message: message.clone(),
            },
        }
    }
}

/// Export job orchestrator.
#[derive(Clone)]
pub struct ExportService {
    state: ServiceState,
    source: Arc<dyn ExportDataSource>,
    engine: Arc<dyn ExportEngine>,
    telemetry: Arc<dyn Telemetry>,
    event_bus: EventBus,
}

impl ExportService {
    pub fn new(
        source: Arc<dyn ExportDataSource>,
        engine: Arc<dyn ExportEngine>,
        telemetry: Arc<dyn Telemetry>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            source,
            engine,
            telemetry,
            event_bus,
        }
    }

    /// Export every interview session. Requires a logged-in session.
    pub async fn export_sessions(&self, ctx: &RequestContext) -> FrescoResult<ExportResult> {
        let Some(session) = &ctx.session else {
            return Err(FrescoError::Unauthorized(
                messages::EXPORT_REQUIRES_LOGIN.to_string(),
            ));
        };
        info!("export requested by {}", session.username);

        match self.run_export().await {
            Ok(ExportOutput { data, message }) => {
                self.telemetry
                    .track_event(TelemetryEvent::interview_completed(true))
                    .await;
                self.event_bus.emit(AppEvent::ExportFinished {
                    name: data.name.clone(),
                    size: data.size,
                });
                Ok(ExportResult::Success { data, message })
            }
            Err(e) => {
                error!("{}: {e}", messages::EXPORT_FAILED);
                self.telemetry
                    .track_event(TelemetryEvent::error(ErrorDetails {
                        message: messages::EXPORT_FAILED.to_string(),
                        details: e.to_string(),
                        stacktrace: String::new(),
                        path: INTERVIEWS_PATH.to_string(),
                    }))
                    .await;
                self.event_bus.emit(AppEvent::ExportFailed {
                    message: e.to_string(),
                });
                Ok(ExportResult::Failure {
                    message: messages::EXPORT_FAILED.to_string(),
                    error: e,
                })
            }
        }
    }

    async fn run_export(&self) -> FrescoResult<ExportOutput> {
        let interviews = self.source.interviews().await?;
        let protocols = self.source.protocols().await?;

        let sessions = format_exportable_sessions(&interviews, &protocols);
        let by_remote_id = reindex_protocols(&protocols);
        info!(
            "exporting {} session(s) across {} protocol(s)",
            sessions.len(),
            by_remote_id.len()
        );
        self.event_bus.emit(AppEvent::ExportStarted {
            session_count: sessions.len(),
        });

        let job = self.engine.prepare(sessions, by_remote_id).await?;
        let (progress, events) = ProgressSender::channel();
        let (result, reported_error) = tokio::join!(job.run(progress), self.observe_job(events));

        if let (Ok(_), Some(message)) = (&result, reported_error) {
            warn!("export job reported an error ({message}) but completed");
        }
        result
    }

    /// Log and forward job events until the job drops its sender.
    /// Returns the message of the error event, if one arrived.
    async fn observe_job(&self, mut events: mpsc::UnboundedReceiver<ExportEvent>) -> Option<String> {
        let mut reported_error = None;

        while let Some(event) = events.recv().await {
            match event {
                ExportEvent::Begin => {
                    info!("Starting export... (0%)");
                    self.event_bus.emit(AppEvent::ExportProgress {
                        status_text: "Starting export...".into(),
                        progress: 0,
                    });
                }
                ExportEvent::Update {
                    status_text,
                    progress,
                }
                | ExportEvent::Finished {
                    status_text,
                    progress,
                } => {
                    info!("{status_text} ({progress}%)");
                    self.event_bus.emit(AppEvent::ExportProgress {
                        status_text,
                        progress,
                    });
                }
                ExportEvent::SessionExported { session_id } => match session_id {
                    Some(id) if !id.trim().is_empty() => {
                        info!("session exported: {id}");
                        self.event_bus
                            .emit(AppEvent::SessionExported { session_id: id });
                    }
                    _ => warn!("session-exported event did not contain a session id"),
                },
                ExportEvent::Error { message, cause } => {
                    warn!("session export failed: {message} ({cause})");
                    reported_error = Some(message);
                }
            }
        }

        reported_error
    }
}

impl Service for ExportService {
    fn name(&self) -> &str {
        "export"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> FrescoResult<()> {
        self.state = ServiceState::Running;
        info!("export service initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> FrescoResult<()> {
        self.state = ServiceState::Stopped;
        info!("export service shut down");
        Ok(())
    }
}
