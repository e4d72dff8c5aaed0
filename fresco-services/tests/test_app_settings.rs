//! Integration tests for the AppSettings lifecycle.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::*;
use fresco_core::config::Environment;
use fresco_core::constants::{cache_tags, messages, UNCONFIGURED_TIMEOUT_MS};
use fresco_core::error::FrescoError;
use fresco_models::{AppSettings, Database, DatabaseStats};
use fresco_services::app_settings::{AppSettingsService, SetupStatus};
use fresco_services::auth::{AuthProvider, DatabaseAuthProvider, RequestContext};
use fresco_services::event_bus::{AppEvent, EventBus};

struct Harness {
    _dir: tempfile::TempDir,
    db: Database,
    bus: EventBus,
    service: AppSettingsService,
}

fn harness(environment: Environment) -> Harness {
    let (db, dir) = create_test_db();
    let bus = create_test_event_bus();
    let auth = Arc::new(DatabaseAuthProvider::new(db.clone(), bus.clone()));
    let service = AppSettingsService::new(
        create_test_config_handle(environment),
        db.clone(),
        auth,
        bus.clone(),
    );
    Harness {
        _dir: dir,
        db,
        bus,
        service,
    }
}

#[tokio::test]
async fn test_get_before_initialization() {
    let h = harness(Environment::Production);
    assert_eq!(h.service.get().await.unwrap(), None);
    assert_eq!(h.service.setup_status().await.unwrap(), SetupStatus::Uninitialized);
}

#[tokio::test]
async fn test_create_then_get() {
    let h = harness(Environment::Production);
    let mut rx = h.bus.subscribe();

    let created = h.service.create().await;
    assert!(created.is_ok());
    let settings = created.app_settings.unwrap();
    assert!(!settings.configured);
    assert!(!settings.allow_anonymous_recruitment);

    let view = h.service.get().await.unwrap().unwrap();
    assert_eq!(view.settings, settings);
    assert!(!view.expired);
    assert_eq!(h.service.setup_status().await.unwrap(), SetupStatus::PendingSetup);

    let events = drain_events(&mut rx);
    assert!(events.contains(&AppEvent::CacheRevalidated {
        tag: cache_tags::APP_SETTINGS_GET.into()
    }));
    assert!(events.contains(&AppEvent::AppSettingsCreated));
}

#[tokio::test]
async fn test_second_create_fails_softly() {
    let h = harness(Environment::Production);
    let first = h.service.create().await.app_settings.unwrap();

    let second = h.service.create().await;
    assert_eq!(second.error.as_deref(), Some(messages::CREATE_SETTINGS_FAILED));
    assert_eq!(second.app_settings, None);

    let view = h.service.get().await.unwrap().unwrap();
    assert_eq!(view.settings, first);
    assert_eq!(h.db.stats().unwrap().app_settings, 1);
}

#[tokio::test]
async fn test_expiry_boundary_through_get_at() {
    let h = harness(Environment::Production);
    let settings = h.service.create().await.app_settings.unwrap();
    let at_limit = settings.initialized_at + Duration::milliseconds(UNCONFIGURED_TIMEOUT_MS);

    let view = h.service.get_at(at_limit).await.unwrap().unwrap();
    assert!(!view.expired);

    let past = at_limit + Duration::milliseconds(1);
    let view = h.service.get_at(past).await.unwrap().unwrap();
    assert!(view.expired);
}

#[tokio::test]
async fn test_stale_installation_is_expired() {
    let h = harness(Environment::Production);
    {
        let conn = h.db.conn().unwrap();
        AppSettings::insert(&conn, Utc::now() - Duration::hours(2)).unwrap();
    }
    assert_eq!(h.service.setup_status().await.unwrap(), SetupStatus::Expired);

    assert!(h.service.set_configured().await.is_ok());
    let view = h.service.get().await.unwrap().unwrap();
    assert!(view.settings.configured);
    assert!(!view.expired);
    assert_eq!(h.service.setup_status().await.unwrap(), SetupStatus::Configured);
}

#[tokio::test]
async fn test_set_configured_without_row() {
    let h = harness(Environment::Production);
    let mut rx = h.bus.subscribe();

    let result = h.service.set_configured().await;
    assert!(result.is_ok());
    assert_eq!(h.service.get().await.unwrap(), None);
    assert!(drain_events(&mut rx).contains(&AppEvent::CacheRevalidated {
        tag: cache_tags::APP_SETTINGS_GET.into()
    }));
}

#[tokio::test]
async fn test_anonymous_recruitment_requires_session() {
    let h = harness(Environment::Production);
    h.service.create().await;

    let err = h
        .service
        .update_anonymous_recruitment(&RequestContext::anonymous(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, FrescoError::Unauthorized(_)));
    assert!(!h.service.get().await.unwrap().unwrap().settings.allow_anonymous_recruitment);
}

#[tokio::test]
async fn test_anonymous_recruitment_update() {
    let h = harness(Environment::Production);
    let ctx = RequestContext::with_session(seed_session(&h.db, &h.bus, "researcher"));

    let empty = h.service.update_anonymous_recruitment(&ctx, true).await.unwrap();
    assert_eq!(empty.app_settings.unwrap().count, 0);

    h.service.create().await;
    // Prime the cache so the update has something to invalidate.
    h.service.get().await.unwrap();

    let updated = h.service.update_anonymous_recruitment(&ctx, true).await.unwrap();
    assert!(updated.is_ok());
    assert_eq!(updated.app_settings.unwrap().count, 1);
    assert!(h.service.get().await.unwrap().unwrap().settings.allow_anonymous_recruitment);
}

#[tokio::test]
async fn test_reset_forbidden_outside_development() {
    let h = harness(Environment::Production);
    h.service.create().await;

    let err = h.service.reset(&RequestContext::anonymous()).await.unwrap_err();
    assert!(matches!(err, FrescoError::Forbidden(_)));
    assert!(h.service.get().await.unwrap().is_some());
}

#[tokio::test]
async fn test_reset_on_empty_store() {
    let h = harness(Environment::Development);
    let result = h.service.reset(&RequestContext::anonymous()).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(h.db.stats().unwrap(), DatabaseStats::default());
}

#[tokio::test]
async fn test_reset_wipes_installation() {
    let h = harness(Environment::Development);
    h.service.create().await;
    let session = seed_session(&h.db, &h.bus, "researcher");
    seed_session(&h.db, &h.bus, "assistant");
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    seed_interview(&h.db, "P-002", &protocol);
    assert!(h.service.get().await.unwrap().is_some());
    let mut rx = h.bus.subscribe();

    let result = h
        .service
        .reset(&RequestContext::with_session(session.clone()))
        .await
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(h.db.stats().unwrap(), DatabaseStats::default());
    assert_eq!(h.service.get().await.unwrap(), None);

    let auth = DatabaseAuthProvider::new(h.db.clone(), h.bus.clone());
    assert_eq!(auth.get_server_session(&session.id).await.unwrap(), None);

    let events = drain_events(&mut rx);
    assert_eq!(
        events.first(),
        Some(&AppEvent::SessionSignedOut {
            session_id: session.id
        })
    );
    assert!(events.contains(&AppEvent::InstallationReset));
}

#[tokio::test]
async fn test_reset_stops_when_sign_out_fails() {
    let (db, _dir) = create_test_db();
    let bus = create_test_event_bus();
    let service = AppSettingsService::new(
        create_test_config_handle(Environment::Development),
        db.clone(),
        Arc::new(FailingSignOut),
        bus.clone(),
    );
    service.create().await;
    let session = seed_session(&db, &bus, "researcher");

    let result = service
        .reset(&RequestContext::with_session(session))
        .await
        .unwrap();

    assert_eq!(result.error.as_deref(), Some(messages::RESET_SETTINGS_FAILED));
    let stats = db.stats().unwrap();
    assert_eq!(stats.app_settings, 1);
    assert_eq!(stats.users, 1);
}

#[tokio::test]
async fn test_reset_keeps_earlier_deletes_when_a_step_fails() {
    let h = harness(Environment::Development);
    h.service.create().await;
    seed_session(&h.db, &h.bus, "researcher");
    let protocol = seed_protocol(&h.db, "Study");
    seed_interview(&h.db, "P-001", &protocol);
    h.db.conn()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER block_participant_delete BEFORE DELETE ON participants
             BEGIN SELECT RAISE(ABORT, 'participants are locked'); END;",
        )
        .unwrap();

    let result = h.service.reset(&RequestContext::anonymous()).await.unwrap();

    assert_eq!(result.error.as_deref(), Some(messages::RESET_SETTINGS_FAILED));
    let stats = h.db.stats().unwrap();
    assert_eq!(stats.app_settings, 0);
    assert_eq!(stats.users, 0);
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.participants, 1);
    assert_eq!(stats.protocols, 1);
    assert_eq!(stats.interviews, 1);
}

#[tokio::test]
async fn test_ensure_initialized_creates_once() {
    let h = harness(Environment::Production);
    let first = h.service.ensure_initialized().await.unwrap();
    let second = h.service.ensure_initialized().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.db.stats().unwrap().app_settings, 1);
}

#[tokio::test]
async fn test_concurrent_creates_leave_one_row() {
    let h = harness(Environment::Production);
    let (a, b) = tokio::join!(h.service.create(), h.service.create());
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(h.db.stats().unwrap().app_settings, 1);
}
