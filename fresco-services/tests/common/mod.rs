//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use fresco_core::config::{AppConfig, ConfigHandle, DatabaseConfig, Environment};
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{
    Database, Interview, InterviewWithParticipant, Participant, Protocol, ProtocolDocument,
};
use fresco_services::auth::{AuthProvider, DatabaseAuthProvider, Session};
use fresco_services::event_bus::{AppEvent, EventBus};
use fresco_services::export::ExportDataSource;
use fresco_services::export_engine::{
    ExportEngine, ExportJob, ExportOutput, ProgressSender, UploadData,
};
use fresco_services::formatter::ExportableSession;
use fresco_services::telemetry::{Telemetry, TelemetryEvent};

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let config = DatabaseConfig::default();
    let db = Database::init(&path, &config).expect("failed to init test database");
    (db, dir)
}

/// Default configuration in the given environment.
pub fn create_test_config(environment: Environment) -> AppConfig {
    AppConfig {
        environment,
        ..AppConfig::default()
    }
}

pub fn create_test_config_handle(environment: Environment) -> ConfigHandle {
    ConfigHandle::new(create_test_config(environment))
}

/// Create an EventBus with a small buffer suitable for tests.
pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

/// Everything currently queued on a bus receiver.
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

/// Install a protocol named `name`.
pub fn seed_protocol(db: &Database, name: &str) -> Protocol {
    let conn = db.conn().expect("failed to get connection for seeding");
    let doc: ProtocolDocument = serde_json::from_value(serde_json::json!({
        "schemaVersion": 7,
        "stages": [{"id": "s1", "type": "NameGenerator"}],
        "codebook": {"node": {"person": {"name": "Person"}}}
    }))
    .expect("invalid protocol document");
    Protocol::insert(&conn, name, &doc, &format!("hash-{name}"), Utc::now())
        .expect("failed to insert protocol")
}

/// A participant with one interview on `protocol`.
pub fn seed_interview(db: &Database, identifier: &str, protocol: &Protocol) -> Interview {
    let conn = db.conn().expect("failed to get connection for seeding");
    let participant =
        Participant::insert(&conn, identifier, None).expect("failed to insert participant");
    let network = serde_json::json!({"nodes": [{"_uid": "n1"}], "edges": [], "ego": {}});
    Interview::insert(&conn, &participant.id, &protocol.id, &network, Utc::now())
        .expect("failed to insert interview")
}

/// A signed-up user and its live session.
pub fn seed_session(db: &Database, bus: &EventBus, username: &str) -> Session {
    DatabaseAuthProvider::new(db.clone(), bus.clone())
        .sign_up(username)
        .expect("failed to sign up")
}

/// What the fake engine does when its job runs.
#[derive(Debug, Clone)]
pub enum EngineBehavior {
    Succeed,
    /// Also reports a session-exported event with no id.
    SucceedWithMalformedEvent,
    FailRun(String),
    FailPrepare(String),
}

/// Export engine that records its inputs and follows a scripted behavior.
pub struct FakeEngine {
    behavior: EngineBehavior,
    pub prepare_calls: AtomicUsize,
    pub run_calls: Arc<AtomicUsize>,
    pub received: Mutex<Option<(Vec<ExportableSession>, BTreeMap<String, Protocol>)>>,
}

impl FakeEngine {
    pub fn new(behavior: EngineBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            prepare_calls: AtomicUsize::new(0),
            run_calls: Arc::new(AtomicUsize::new(0)),
            received: Mutex::new(None),
        })
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }
}

pub fn fake_upload() -> UploadData {
    UploadData {
        key: "key-1".into(),
        url: "https://files.example.org/key-1".into(),
        name: "networkCanvasExport.zip".into(),
        size: 1024,
    }
}

#[async_trait]
impl ExportEngine for FakeEngine {
    async fn prepare(
        &self,
        sessions: Vec<ExportableSession>,
        protocols: BTreeMap<String, Protocol>,
    ) -> FrescoResult<Box<dyn ExportJob>> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if let EngineBehavior::FailPrepare(msg) = &self.behavior {
            return Err(FrescoError::Export(msg.clone()));
        }
        let ids = sessions.iter().map(|s| s.session_id.clone()).collect();
        *self.received.lock().unwrap() = Some((sessions, protocols));
        Ok(Box::new(FakeJob {
            behavior: self.behavior.clone(),
            session_ids: ids,
            run_calls: self.run_calls.clone(),
        }))
    }
}

struct FakeJob {
    behavior: EngineBehavior,
    session_ids: Vec<String>,
    run_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ExportJob for FakeJob {
    async fn run(self: Box<Self>, mut progress: ProgressSender) -> FrescoResult<ExportOutput> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        progress.begin();
        for id in &self.session_ids {
            progress.update(format!("exporting {id}"), 50);
            progress.session_exported(Some(id.clone()));
        }
        match self.behavior {
            EngineBehavior::FailRun(msg) => {
                progress.error(msg.clone(), "fake engine");
                Err(FrescoError::Export(msg))
            }
            behavior => {
                if matches!(behavior, EngineBehavior::SucceedWithMalformedEvent) {
                    progress.session_exported(None);
                }
                progress.finished("Export complete", 100);
                Ok(ExportOutput {
                    data: fake_upload(),
                    message: "Export complete".into(),
                })
            }
        }
    }
}

/// Telemetry sink that keeps every event.
#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn recorded(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Telemetry for RecordingTelemetry {
    async fn track_event(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Data source whose reads always fail.
pub struct FailingSource;

#[async_trait]
impl ExportDataSource for FailingSource {
    async fn interviews(&self) -> FrescoResult<Vec<InterviewWithParticipant>> {
        Err(FrescoError::Database("interviews unavailable".into()))
    }

    async fn protocols(&self) -> FrescoResult<Vec<Protocol>> {
        Err(FrescoError::Database("protocols unavailable".into()))
    }
}

/// Auth provider whose sign-out always fails.
pub struct FailingSignOut;

#[async_trait]
impl AuthProvider for FailingSignOut {
    async fn get_server_session(&self, _token: &str) -> FrescoResult<Option<Session>> {
        Ok(None)
    }

    async fn sign_out(&self, _session: &Session) -> FrescoResult<()> {
        Err(FrescoError::Database("session store unavailable".into()))
    }
}
