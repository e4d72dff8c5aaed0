//! Export engine contract and the local-file engine.
//!
//! An engine turns a set of exportable sessions plus the protocols they
//! reference into a job. Running the job produces a single uploadable
//! artifact and reports progress through a [`ProgressSender`].
//!
//! Job lifecycle: created, running (begin), any number of updates, then
//! exactly one of finished or error.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use fresco_core::constants::APP_VERSION;
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::Protocol;

use crate::formatter::ExportableSession;

/// Events a running job reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Begin,
    Update {
        status_text: String,
        progress: u8,
    },
    /// A session was written. Engines may omit the id.
    SessionExported {
        session_id: Option<String>,
    },
    Error {
        message: String,
        cause: String,
    },
    Finished {
        status_text: String,
        progress: u8,
    },
}

impl ExportEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Finished { .. })
    }
}

/// Where a job is in its lifecycle, as seen by its progress sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Created,
    Running,
    Finished,
    Failed,
}

/// Progress reporting handle given to a running job.
///
/// Once a terminal event has been sent, further events are dropped.
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ExportEvent>,
    phase: JobPhase,
}

impl ProgressSender {
    /// A sender and the receiver observing it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                phase: JobPhase::Created,
            },
            rx,
        )
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    fn send(&mut self, event: ExportEvent) {
        match self.phase {
            JobPhase::Finished | JobPhase::Failed => {
                debug!("dropping {event:?}: job already {:?}", self.phase);
                return;
            }
            JobPhase::Created => self.phase = JobPhase::Running,
            JobPhase::Running => {}
        }
        match &event {
            ExportEvent::Finished { .. } => self.phase = JobPhase::Finished,
            ExportEvent::Error { .. } => self.phase = JobPhase::Failed,
            _ => {}
        }
        // The observer may have gone away; the job still runs to completion.
        let _ = self.tx.send(event);
    }

    pub fn begin(&mut self) {
        if self.phase == JobPhase::Created {
            self.send(ExportEvent::Begin);
        }
    }

    pub fn update(&mut self, status_text: impl Into<String>, progress: u8) {
        self.send(ExportEvent::Update {
            status_text: status_text.into(),
            progress: progress.min(100),
        });
    }

    pub fn session_exported(&mut self, session_id: Option<String>) {
        self.send(ExportEvent::SessionExported { session_id });
    }

    pub fn error(&mut self, message: impl Into<String>, cause: impl Into<String>) {
        self.send(ExportEvent::Error {
            message: message.into(),
            cause: cause.into(),
        });
    }

    pub fn finished(&mut self, status_text: impl Into<String>, progress: u8) {
        self.send(ExportEvent::Finished {
            status_text: status_text.into(),
            progress: progress.min(100),
        });
    }
}

/// Where the export artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadData {
    pub key: String,
    pub url: String,
    pub name: String,
    pub size: u64,
}

/// Successful job output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutput {
    pub data: UploadData,
    pub message: String,
}

/// A prepared export, run at most once.
#[async_trait]
pub trait ExportJob: Send {
    async fn run(self: Box<Self>, progress: ProgressSender) -> FrescoResult<ExportOutput>;
}

/// Builds export jobs.
#[async_trait]
pub trait ExportEngine: Send + Sync {
    /// Prepare a job for `sessions`, with protocols keyed by remote protocol id.
    async fn prepare(
        &self,
        sessions: Vec<ExportableSession>,
        protocols: BTreeMap<String, Protocol>,
    ) -> FrescoResult<Box<dyn ExportJob>>;
}

/// Writes each export as one JSON bundle in a local directory.
#[derive(Debug, Clone)]
pub struct FileExportEngine {
    output_dir: PathBuf,
    pretty: bool,
}

impl FileExportEngine {
    pub fn new(output_dir: PathBuf, pretty: bool) -> Self {
        Self { output_dir, pretty }
    }
}

#[async_trait]
impl ExportEngine for FileExportEngine {
    async fn prepare(
        &self,
        sessions: Vec<ExportableSession>,
        protocols: BTreeMap<String, Protocol>,
    ) -> FrescoResult<Box<dyn ExportJob>> {
        debug!(
            "prepared file export of {} session(s), {} protocol(s)",
            sessions.len(),
            protocols.len()
        );
        Ok(Box::new(FileExportJob {
            output_dir: self.output_dir.clone(),
            pretty: self.pretty,
            sessions,
            protocols,
        }))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportBundle<'a> {
    app_version: &'a str,
    exported_at: DateTime<Utc>,
    protocols: &'a BTreeMap<String, Protocol>,
    sessions: &'a [ExportableSession],
}

struct FileExportJob {
    output_dir: PathBuf,
    pretty: bool,
    sessions: Vec<ExportableSession>,
    protocols: BTreeMap<String, Protocol>,
}

impl FileExportJob {
    async fn write_bundle(&self, progress: &mut ProgressSender) -> FrescoResult<ExportOutput> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let total = self.sessions.len();
        for (i, session) in self.sessions.iter().enumerate() {
            let pct = ((i + 1) * 90 / total.max(1)) as u8;
            progress.update(format!("Exporting session {} of {total}", i + 1), pct);
            progress.session_exported(Some(session.session_id.clone()));
        }

        let exported_at = Utc::now();
        let bundle = ExportBundle {
            app_version: APP_VERSION,
            exported_at,
            protocols: &self.protocols,
            sessions: &self.sessions,
        };
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&bundle)?
        } else {
            serde_json::to_vec(&bundle)?
        };

        progress.update("Writing export file...", 95);
        let name = format!("networkCanvasExport-{}.json", exported_at.timestamp_millis());
        let path = self.output_dir.join(&name);
        tokio::fs::write(&path, &bytes).await?;
        info!("wrote export {} ({} bytes)", path.display(), bytes.len());

        Ok(ExportOutput {
            data: UploadData {
                key: uuid::Uuid::new_v4().simple().to_string(),
                url: format!("file://{}", path.display()),
                name,
                size: bytes.len() as u64,
            },
            message: format!("Exported {total} session(s)"),
        })
    }
}

#[async_trait]
impl ExportJob for FileExportJob {
    async fn run(self: Box<Self>, mut progress: ProgressSender) -> FrescoResult<ExportOutput> {
        progress.begin();
        match self.write_bundle(&mut progress).await {
            Ok(output) => {
                progress.finished("Export complete", 100);
                Ok(output)
            }
            Err(e) => {
                progress.error("Export failed", e.to_string());
                Err(FrescoError::Export(e.to_string()))
            }
        }
    }
}
