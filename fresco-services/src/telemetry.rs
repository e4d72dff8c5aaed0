//! Best-effort analytics events.
//!
//! Tracking never fails the caller: sinks log transport problems and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fresco_core::config::TelemetryConfig;
use fresco_core::error::{FrescoError, FrescoResult};

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEventType {
    InterviewCompleted,
    Error,
}

/// Error context attached to `Error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    pub details: String,
    pub stacktrace: String,
    pub path: String,
}

/// One analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub event_type: TelemetryEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

impl TelemetryEvent {
    pub fn interview_completed(success: bool) -> Self {
        Self {
            event_type: TelemetryEventType::InterviewCompleted,
            metadata: Some(serde_json::json!({ "success": success })),
            error: None,
        }
    }

    pub fn error(details: ErrorDetails) -> Self {
        Self {
            event_type: TelemetryEventType::Error,
            metadata: None,
            error: Some(details),
        }
    }
}

/// Destination for analytics events.
#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn track_event(&self, event: TelemetryEvent);
}

/// Logs events and sends them nowhere.
#[derive(Debug, Clone, Default)]
pub struct LogTelemetry;

#[async_trait]
impl Telemetry for LogTelemetry {
    async fn track_event(&self, event: TelemetryEvent) {
        info!("telemetry: {:?}", event.event_type);
        debug!("telemetry payload: {event:?}");
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    #[serde(flatten)]
    event: &'a TelemetryEvent,
    installation_id: &'a str,
    timestamp: chrono::DateTime<Utc>,
}

/// Posts events as JSON to an analytics endpoint.
#[derive(Clone)]
pub struct HttpTelemetry {
    inner: Client,
    endpoint: String,
    installation_id: String,
}

impl HttpTelemetry {
    pub fn new(endpoint: &str, installation_id: &str) -> FrescoResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| FrescoError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            endpoint: endpoint.to_string(),
            installation_id: installation_id.to_string(),
        })
    }

    async fn send(&self, event: &TelemetryEvent) -> FrescoResult<()> {
        let envelope = Envelope {
            event,
            installation_id: &self.installation_id,
            timestamp: Utc::now(),
        };
        let response = self
            .inner
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| FrescoError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FrescoError::Http(format!("telemetry endpoint returned {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Telemetry for HttpTelemetry {
    async fn track_event(&self, event: TelemetryEvent) {
        match self.send(&event).await {
            Ok(()) => debug!("telemetry sent: {:?}", event.event_type),
            Err(e) => warn!("telemetry dropped {:?}: {e}", event.event_type),
        }
    }
}

/// The HTTP sink when telemetry is enabled with an endpoint, otherwise the log sink.
pub fn telemetry_from_config(config: &TelemetryConfig) -> Arc<dyn Telemetry> {
    if config.enabled && !config.endpoint.is_empty() {
        match HttpTelemetry::new(&config.endpoint, &config.installation_id) {
            Ok(sink) => return Arc::new(sink),
            Err(e) => warn!("falling back to log telemetry: {e}"),
        }
    }
    Arc::new(LogTelemetry)
}
