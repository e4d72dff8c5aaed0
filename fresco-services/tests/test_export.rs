//! Integration tests for the export orchestrator.

mod common;

use std::sync::Arc;

use common::*;
use fresco_core::constants::{messages, INTERVIEWS_PATH};
use fresco_core::error::FrescoError;
use fresco_services::auth::RequestContext;
use fresco_services::event_bus::AppEvent;
use fresco_services::export::{DatabaseExportSource, ExportResult, ExportService};
use fresco_services::export_engine::FileExportEngine;
use fresco_services::formatter::remote_protocol_id;
use fresco_services::telemetry::TelemetryEventType;

struct Harness {
    _dir: tempfile::TempDir,
    db: fresco_models::Database,
    bus: fresco_services::EventBus,
    ctx: RequestContext,
}

fn harness() -> Harness {
    let (db, dir) = create_test_db();
    let bus = create_test_event_bus();
    let session = seed_session(&db, &bus, "researcher");
    Harness {
        _dir: dir,
        db,
        bus,
        ctx: RequestContext::with_session(session),
    }
}

fn service(h: &Harness, engine: Arc<FakeEngine>, telemetry: Arc<RecordingTelemetry>) -> ExportService {
    ExportService::new(
        Arc::new(DatabaseExportSource::new(h.db.clone())),
        engine,
        telemetry,
        h.bus.clone(),
    )
}

#[tokio::test]
async fn test_export_success_returns_engine_payload() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    let interview = seed_interview(&h.db, "P-001", &protocol);
    let engine = FakeEngine::new(EngineBehavior::Succeed);
    let telemetry = RecordingTelemetry::new();

    let result = service(&h, engine.clone(), telemetry.clone())
        .export_sessions(&h.ctx)
        .await
        .unwrap();

    match &result {
        ExportResult::Success { data, message } => {
            assert_eq!(data, &fake_upload());
            assert_eq!(message, "Export complete");
        }
        ExportResult::Failure { error, .. } => panic!("unexpected failure: {error}"),
    }
    let response = result.to_response();
    assert_eq!(response.error, None);
    assert_eq!(response.data, Some(fake_upload()));

    let events = telemetry.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, TelemetryEventType::InterviewCompleted);
    assert_eq!(events[0].metadata, Some(serde_json::json!({"success": true})));

    let received = engine.received.lock().unwrap().clone().unwrap();
    let (sessions, protocols) = received;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, interview.id);
    assert_eq!(sessions[0].session_variables.protocol_uid, remote_protocol_id("Study"));
    assert!(protocols.contains_key(&remote_protocol_id("Study")));
}

#[tokio::test]
async fn test_export_engine_failure_is_contained() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    let engine = FakeEngine::new(EngineBehavior::FailRun("engine down".into()));
    let telemetry = RecordingTelemetry::new();

    let result = service(&h, engine.clone(), telemetry.clone())
        .export_sessions(&h.ctx)
        .await
        .unwrap();

    match &result {
        ExportResult::Failure { message, error } => {
            assert_eq!(message, messages::EXPORT_FAILED);
            assert!(error.to_string().contains("engine down"));
        }
        ExportResult::Success { .. } => panic!("expected failure"),
    }
    let response = result.to_response();
    assert_eq!(response.data, None);
    assert_eq!(response.message, "Failed to export interview sessions!");

    let events = telemetry.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, TelemetryEventType::Error);
    let details = events[0].error.as_ref().unwrap();
    assert_eq!(details.message, messages::EXPORT_FAILED);
    assert_eq!(details.path, INTERVIEWS_PATH);
    assert_eq!(engine.run_count(), 1);
}

#[tokio::test]
async fn test_export_without_session_does_nothing() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    let engine = FakeEngine::new(EngineBehavior::Succeed);
    let telemetry = RecordingTelemetry::new();
    let mut rx = h.bus.subscribe();

    let err = service(&h, engine.clone(), telemetry.clone())
        .export_sessions(&RequestContext::anonymous())
        .await
        .unwrap_err();

    assert!(matches!(err, FrescoError::Unauthorized(_)));
    assert_eq!(engine.prepare_count(), 0);
    assert_eq!(engine.run_count(), 0);
    assert!(telemetry.recorded().is_empty());
    assert!(drain_events(&mut rx).is_empty());
}

#[tokio::test]
async fn test_read_failure_becomes_failure_result() {
    let h = harness();
    let engine = FakeEngine::new(EngineBehavior::Succeed);
    let telemetry = RecordingTelemetry::new();
    let svc = ExportService::new(
        Arc::new(FailingSource),
        engine.clone(),
        telemetry.clone(),
        h.bus.clone(),
    );

    let result = svc.export_sessions(&h.ctx).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.message(), messages::EXPORT_FAILED);
    assert_eq!(engine.prepare_count(), 0);
    let events = telemetry.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, TelemetryEventType::Error);
}

#[tokio::test]
async fn test_prepare_failure_becomes_failure_result() {
    let h = harness();
    let engine = FakeEngine::new(EngineBehavior::FailPrepare("no capacity".into()));
    let telemetry = RecordingTelemetry::new();

    let result = service(&h, engine.clone(), telemetry.clone())
        .export_sessions(&h.ctx)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(engine.run_count(), 0);
    assert_eq!(telemetry.recorded().len(), 1);
}

#[tokio::test]
async fn test_progress_forwarded_to_event_bus() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    let interview = seed_interview(&h.db, "P-001", &protocol);
    let mut rx = h.bus.subscribe();

    service(&h, FakeEngine::new(EngineBehavior::Succeed), RecordingTelemetry::new())
        .export_sessions(&h.ctx)
        .await
        .unwrap();

    let events = drain_events(&mut rx);
    assert_eq!(events.first(), Some(&AppEvent::ExportStarted { session_count: 1 }));
    assert!(events.contains(&AppEvent::ExportProgress {
        status_text: "Starting export...".into(),
        progress: 0,
    }));
    assert!(events.contains(&AppEvent::SessionExported {
        session_id: interview.id.clone(),
    }));
    assert!(events.contains(&AppEvent::ExportProgress {
        status_text: "Export complete".into(),
        progress: 100,
    }));
    assert_eq!(
        events.last(),
        Some(&AppEvent::ExportFinished {
            name: fake_upload().name,
            size: fake_upload().size,
        })
    );
}

#[tokio::test]
async fn test_failure_announced_on_event_bus() {
    let h = harness();
    let mut rx = h.bus.subscribe();

    service(
        &h,
        FakeEngine::new(EngineBehavior::FailRun("engine down".into())),
        RecordingTelemetry::new(),
    )
    .export_sessions(&h.ctx)
    .await
    .unwrap();

    let events = drain_events(&mut rx);
    assert!(matches!(events.last(), Some(AppEvent::ExportFailed { message }) if message.contains("engine down")));
    assert!(!events.iter().any(|e| matches!(e, AppEvent::ExportFinished { .. })));
}

#[tokio::test]
async fn test_malformed_session_event_is_ignored() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    let mut rx = h.bus.subscribe();

    let result = service(
        &h,
        FakeEngine::new(EngineBehavior::SucceedWithMalformedEvent),
        RecordingTelemetry::new(),
    )
    .export_sessions(&h.ctx)
    .await
    .unwrap();

    assert!(result.is_success());
    let exported = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, AppEvent::SessionExported { .. }))
        .count();
    assert_eq!(exported, 1);
}

#[tokio::test]
async fn test_same_named_protocols_collapse() {
    let h = harness();
    let first = seed_protocol(&h.db, "Study");
    // Same name, different content hash.
    let conn = h.db.conn().unwrap();
    let doc: fresco_models::ProtocolDocument =
        serde_json::from_value(serde_json::json!({"schemaVersion": 8})).unwrap();
    let second = fresco_models::Protocol::insert(
        &conn,
        "Study",
        &doc,
        "hash-other",
        chrono::Utc::now() + chrono::Duration::seconds(1),
    )
    .unwrap();
    drop(conn);
    seed_interview(&h.db, "P-001", &first);
    seed_interview(&h.db, "P-002", &second);
    let engine = FakeEngine::new(EngineBehavior::Succeed);

    service(&h, engine.clone(), RecordingTelemetry::new())
        .export_sessions(&h.ctx)
        .await
        .unwrap();

    let (sessions, protocols) = engine.received.lock().unwrap().clone().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(protocols.len(), 1);
    assert_eq!(protocols[&remote_protocol_id("Study")].id, second.id);
}

#[tokio::test]
async fn test_end_to_end_file_export() {
    let h = harness();
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    let out_dir = h._dir.path().join("exports");
    let telemetry = RecordingTelemetry::new();

    let svc = ExportService::new(
        Arc::new(DatabaseExportSource::new(h.db.clone())),
        Arc::new(FileExportEngine::new(out_dir.clone(), true)),
        telemetry.clone(),
        h.bus.clone(),
    );
    let result = svc.export_sessions(&h.ctx).await.unwrap();

    let ExportResult::Success { data, .. } = result else {
        panic!("file export failed");
    };
    let bundle: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out_dir.join(&data.name)).unwrap()).unwrap();
    assert_eq!(bundle["sessions"].as_array().unwrap().len(), 1);
    assert!(bundle["protocols"][remote_protocol_id("Study")].is_object());
    assert_eq!(telemetry.recorded().len(), 1);
}
