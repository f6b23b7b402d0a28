use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PistonConfig {
    /// Base URL of the execution service, without the `/api/v2` suffix
    pub api_url: String,

    /// Transport-level timeout applied by the underlying HTTP client
    pub timeout: Duration,

    /// Value sent in the `User-Agent` header
    pub user_agent: String,
}

impl Default for PistonConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:2000".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("exec-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl PistonConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.api_url.trim_end_matches('/'), path)
    }
}
