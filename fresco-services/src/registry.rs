//! Service registry for dependency injection and lifecycle management.
//!
//! The registry holds the shared infrastructure (config, database, event
//! bus), builds the services on top of it, initializes them in order and
//! shuts them down in reverse.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use fresco_core::config::{AppConfig, ConfigHandle};
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::Database;

use crate::app_settings::AppSettingsService;
use crate::auth::{AuthProvider, DatabaseAuthProvider};
use crate::event_bus::EventBus;
use crate::export::{DatabaseExportSource, ExportService};
use crate::export_engine::FileExportEngine;
use crate::service::{Service, ServiceState};
use crate::telemetry::telemetry_from_config;

/// Central registry that wires and manages all application services.
pub struct ServiceRegistry {
    /// Application configuration.
    pub config: ConfigHandle,
    /// Database connection pool.
    pub database: Database,
    /// Application-level event bus.
    pub event_bus: EventBus,
    auth: Arc<DatabaseAuthProvider>,
    app_settings: Option<AppSettingsService>,
    export: Option<ExportService>,
    /// Registered services in initialization order.
    services: Vec<(String, Arc<RwLock<Box<dyn Service>>>)>,
}

impl ServiceRegistry {
    /// Create a new ServiceRegistry with core infrastructure.
    pub fn new(config: ConfigHandle, database: Database) -> Self {
        let event_bus = EventBus::new(256);
        let auth = Arc::new(DatabaseAuthProvider::new(database.clone(), event_bus.clone()));
        Self {
            config,
            database,
            event_bus,
            auth,
            app_settings: None,
            export: None,
            services: Vec::new(),
        }
    }

    /// Register a service. Services are initialized in registration order.
    pub fn register<S: Service + 'static>(&mut self, service: S) {
        let name = service.name().to_string();
        info!("registered service: {name}");
        self.services
            .push((name, Arc::new(RwLock::new(Box::new(service)))));
    }

    /// Register the default services.
    ///
    /// Initialization order:
    /// 1. AppSettings (config, database, auth, event_bus)
    /// 2. Export (database, export engine, telemetry, event_bus)
    pub fn register_all(&mut self, config: &AppConfig) -> FrescoResult<()> {
        let bus = self.event_bus.clone();

        // 1. AppSettings
        let app_settings = AppSettingsService::new(
            self.config.clone(),
            self.database.clone(),
            self.auth.clone(),
            bus.clone(),
        );
        self.register(app_settings.clone());
        self.app_settings = Some(app_settings);

        // 2. Export
        let engine = FileExportEngine::new(
            config.effective_export_dir()?,
            config.export.pretty_print,
        );
        let export = ExportService::new(
            Arc::new(DatabaseExportSource::new(self.database.clone())),
            Arc::new(engine),
            telemetry_from_config(&config.telemetry),
            bus,
        );
        self.register(export.clone());
        self.export = Some(export);

        info!("registered {} default services", self.services.len());
        Ok(())
    }

    /// Initialize all registered services in order.
    pub async fn init_all(&self) -> FrescoResult<()> {
        info!("initializing {} services", self.services.len());

        for (name, service) in &self.services {
            info!("initializing service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(FrescoError::ServiceInit(format!("{name}: {e}")));
            }
        }

        info!("all services initialized");
        Ok(())
    }

    /// Shut down all services in reverse order.
    pub async fn shutdown_all(&self) -> FrescoResult<()> {
        info!("shutting down services");

        for (name, service) in self.services.iter().rev() {
            info!("shutting down service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.shutdown() {
                error!("error shutting down service {name}: {e}");
            }
        }

        info!("all services shut down");
        Ok(())
    }

    /// Session provider backed by the database.
    pub fn auth(&self) -> Arc<DatabaseAuthProvider> {
        self.auth.clone()
    }

    /// Session provider as a trait object.
    pub fn auth_provider(&self) -> Arc<dyn AuthProvider> {
        self.auth.clone()
    }

    pub fn app_settings(&self) -> FrescoResult<AppSettingsService> {
        self.app_settings
            .clone()
            .ok_or_else(|| FrescoError::ServiceNotInitialized("app_settings".into()))
    }

    pub fn export(&self) -> FrescoResult<ExportService> {
        self.export
            .clone()
            .ok_or_else(|| FrescoError::ServiceNotInitialized("export".into()))
    }

    /// Get a reference to the event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Get the health status of all services.
    pub async fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        let mut results = Vec::new();
        for (name, service) in &self.services {
            let svc = service.read().await;
            results.push((name.clone(), svc.state(), svc.is_healthy()));
        }
        results
    }

    /// Get the number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
