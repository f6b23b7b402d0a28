use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::executor::RemoteExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy { runtime_count: usize },
    Unhealthy { cause: String },
}

/// Client-facing text for an unreachable remote
pub const HEALTH_ERROR_MESSAGE: &str = "Cannot connect to code execution service";

/// Readiness report returned by the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    /// `connected` or `disconnected`
    pub piston_status: String,
    pub available_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_runtime_count: Option<usize>,
    /// Fixed client-facing text; the probe cause is only logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn new(status: &HealthStatus, available_languages: Vec<String>) -> Self {
        match status {
            HealthStatus::Healthy { runtime_count } => Self {
                status: "healthy".to_string(),
                piston_status: "connected".to_string(),
                available_languages,
                remote_runtime_count: Some(*runtime_count),
                error: None,
            },
            HealthStatus::Unhealthy { .. } => Self {
                status: "unhealthy".to_string(),
                piston_status: "disconnected".to_string(),
                available_languages,
                remote_runtime_count: None,
                error: Some(HEALTH_ERROR_MESSAGE.to_string()),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Read-only availability check of the remote executor
pub struct HealthProber {
    remote: Arc<dyn RemoteExecutor>,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(remote: Arc<dyn RemoteExecutor>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub async fn probe(&self) -> HealthStatus {
        match timeout(self.timeout, self.remote.runtimes()).await {
            Ok(Ok(runtimes)) => HealthStatus::Healthy {
                runtime_count: runtimes.len(),
            },
            Ok(Err(e)) => {
                warn!(error = %e, "health probe failed");
                HealthStatus::Unhealthy {
                    cause: e.to_string(),
                }
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "health probe timed out");
                HealthStatus::Unhealthy {
                    cause: format!("probe timed out after {}ms", self.timeout.as_millis()),
                }
            }
        }
    }
}
