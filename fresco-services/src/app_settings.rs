//! Installation settings lifecycle.
//!
//! Owns the AppSettings singleton: creating it when the installation first
//! boots, marking setup complete, toggling anonymous recruitment, and the
//! development-only reset that wipes the installation.
//!
//! Store failures never escape as `Err`; they are logged and reported as a
//! `MutationResult` carrying a user-facing message. Only access
//! preconditions (no session, no privilege) are returned as errors.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use fresco_core::config::ConfigHandle;
use fresco_core::constants::{cache_tags, messages};
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{AppSettings, Database, Participant, Protocol, User};

use crate::auth::{AuthProvider, RequestContext};
use crate::cache::TagCache;
use crate::event_bus::{AppEvent, EventBus};
use crate::expiry::is_expired;
use crate::service::{Service, ServiceState};

/// Stored settings plus the derived expiry flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettingsView {
    #[serde(flatten)]
    pub settings: AppSettings,
    pub expired: bool,
}

/// Outcome of a settings mutation: an error message or the affected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult<T> {
    pub error: Option<String>,
    pub app_settings: Option<T>,
}

impl<T> MutationResult<T> {
    pub fn success(value: T) -> Self {
        Self {
            error: None,
            app_settings: Some(value),
        }
    }

    /// Success with nothing to report.
    pub fn empty() -> Self {
        Self {
            error: None,
            app_settings: None,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            app_settings: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Rows touched by a bulk update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCount {
    pub count: usize,
}

/// Where an installation stands in its setup lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStatus {
    /// No settings row yet.
    Uninitialized,
    /// Left unconfigured past the timeout; the installation is locked.
    Expired,
    /// Initialized and still inside the setup window.
    PendingSetup,
    Configured,
}

impl std::fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Expired => write!(f, "expired"),
            Self::PendingSetup => write!(f, "pending setup"),
            Self::Configured => write!(f, "configured"),
        }
    }
}

type DeleteStep = fn(&Connection) -> FrescoResult<usize>;

/// Deletes run by `reset`, in order. Cascades remove sessions, keys and
/// interviews along the way.
const RESET_STEPS: [(&str, DeleteStep); 5] = [
    ("app settings", AppSettings::delete_all),
    ("users", User::delete_all),
    ("participants", Participant::delete_all),
    ("protocols", Protocol::delete_all),
    ("app settings", AppSettings::delete_all),
];

/// Service managing the AppSettings singleton.
#[derive(Clone)]
pub struct AppSettingsService {
    state: ServiceState,
    database: Database,
    cache: TagCache<Option<AppSettings>>,
    auth: Arc<dyn AuthProvider>,
    config: ConfigHandle,
    event_bus: EventBus,
}

impl AppSettingsService {
    pub fn new(
        config: ConfigHandle,
        database: Database,
        auth: Arc<dyn AuthProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            database,
            cache: TagCache::new(event_bus.clone()),
            auth,
            config,
            event_bus,
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> FrescoResult<T>) -> FrescoResult<T> {
        let conn = self.database.conn()?;
        f(&conn)
    }

    /// Current settings, or `None` before the installation is initialized.
    pub async fn get(&self) -> FrescoResult<Option<AppSettingsView>> {
        self.get_at(Utc::now()).await
    }

    /// Like [`get`](Self::get), judging expiry as of `now`.
    pub async fn get_at(&self, now: DateTime<Utc>) -> FrescoResult<Option<AppSettingsView>> {
        let stored = self
            .cache
            .get_or_load(cache_tags::APP_SETTINGS_GET, || {
                self.with_conn(AppSettings::find_first)
            })
            .await?;

        let timeout_ms = self.config.read().await.setup.unconfigured_timeout_ms;
        Ok(stored.map(|settings| {
            let expired = is_expired(settings.configured, settings.initialized_at, timeout_ms, now);
            AppSettingsView { settings, expired }
        }))
    }

    /// Initialize the installation. Fails if it is already initialized.
    pub async fn create(&self) -> MutationResult<AppSettings> {
        match self.with_conn(|conn| AppSettings::insert(conn, Utc::now())) {
            Ok(settings) => {
                info!("installation initialized at {}", settings.initialized_at);
                self.cache.revalidate(cache_tags::APP_SETTINGS_GET).await;
                self.event_bus.emit(AppEvent::AppSettingsCreated);
                MutationResult::success(settings)
            }
            Err(e) => {
                warn!("create app settings failed: {e}");
                MutationResult::failed(messages::CREATE_SETTINGS_FAILED)
            }
        }
    }

    /// Toggle anonymous recruitment on every settings row.
    pub async fn update_anonymous_recruitment(
        &self,
        ctx: &RequestContext,
        allow: bool,
    ) -> FrescoResult<MutationResult<UpdateCount>> {
        ctx.require_session("update app settings")?;

        match self.with_conn(|conn| AppSettings::update_anonymous_recruitment(conn, allow)) {
            Ok(count) => {
                info!("anonymous recruitment set to {allow} ({count} row(s))");
                self.cache.revalidate(cache_tags::APP_SETTINGS_GET).await;
                Ok(MutationResult::success(UpdateCount { count }))
            }
            Err(e) => {
                warn!("update anonymous recruitment failed: {e}");
                Ok(MutationResult::failed(messages::UPDATE_SETTINGS_FAILED))
            }
        }
    }

    /// Mark setup complete.
    pub async fn set_configured(&self) -> MutationResult<()> {
        match self.with_conn(AppSettings::set_configured) {
            Ok(count) => {
                if count == 0 {
                    debug!("set_configured touched no rows");
                }
                info!("installation configured");
                self.cache.revalidate(cache_tags::APP_SETTINGS_GET).await;
                self.event_bus.emit(AppEvent::InstallationConfigured);
                MutationResult::empty()
            }
            Err(e) => {
                warn!("set configured failed: {e}");
                MutationResult::failed(messages::UPDATE_SETTINGS_FAILED)
            }
        }
    }

    /// Wipe the installation. Development environments only.
    ///
    /// Deletes run one after another; the first failure stops the reset
    /// and earlier deletes stay applied.
    pub async fn reset(&self, ctx: &RequestContext) -> FrescoResult<MutationResult<()>> {
        if !self.config.read().await.environment.is_development() {
            return Err(FrescoError::Forbidden(
                "reset is only available in development".into(),
            ));
        }

        if let Some(session) = &ctx.session {
            info!("active session found during reset, signing out");
            if let Err(e) = self.auth.sign_out(session).await {
                error!("reset aborted, sign out failed: {e}");
                return Ok(MutationResult::failed(messages::RESET_SETTINGS_FAILED));
            }
        }

        let outcome = self.with_conn(|conn| {
            for (label, step) in RESET_STEPS {
                let removed = step(conn).map_err(|e| {
                    error!("reset aborted while deleting {label}: {e}");
                    e
                })?;
                debug!("reset removed {removed} {label}");
            }
            Ok(())
        });

        match outcome {
            Ok(()) => {
                warn!("installation reset");
                self.cache.revalidate(cache_tags::APP_SETTINGS_GET).await;
                self.event_bus.emit(AppEvent::InstallationReset);
                Ok(MutationResult::empty())
            }
            Err(_) => Ok(MutationResult::failed(messages::RESET_SETTINGS_FAILED)),
        }
    }

    /// Setup lifecycle decision for the installation.
    pub async fn setup_status(&self) -> FrescoResult<SetupStatus> {
        Ok(match self.get().await? {
            None => SetupStatus::Uninitialized,
            Some(view) if view.settings.configured => SetupStatus::Configured,
            Some(view) if view.expired => SetupStatus::Expired,
            Some(_) => SetupStatus::PendingSetup,
        })
    }

    /// Return the settings, creating them first on a fresh installation.
    pub async fn ensure_initialized(&self) -> FrescoResult<AppSettingsView> {
        if let Some(view) = self.get().await? {
            return Ok(view);
        }

        let created = self.create().await;
        if let Some(msg) = created.error {
            // A concurrent create may have won; read whatever is there now.
            debug!("create during ensure_initialized failed: {msg}");
        }

        self.get().await?.ok_or_else(|| {
            FrescoError::Service(messages::CREATE_SETTINGS_FAILED.to_string())
        })
    }
}

impl Service for AppSettingsService {
    fn name(&self) -> &str {
        "app_settings"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> FrescoResult<()> {
        self.database.conn()?;
        self.state = ServiceState::Running;
        info!("app settings service initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> FrescoResult<()> {
        self.state = ServiceState::Stopped;
        info!("app settings service shut down");
        Ok(())
    }
}
