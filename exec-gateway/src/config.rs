use piston_client::PistonConfig;
use std::time::Duration;

use crate::{
    error::Error, executor::RetryPolicy, rate_limit::RateLimitConfig, validator::RequestLimits,
};

/// Everything the gateway can be tuned with
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the remote execution service
    pub piston_url: String,

    /// Hard timeout for each execution attempt
    pub attempt_timeout: Duration,

    /// Maximum attempts per execution
    pub max_retries: u32,

    /// First backoff delay; doubles per retry
    pub backoff_base: Duration,

    /// Timeout for the health probe
    pub health_timeout: Duration,

    pub rate_limit: RateLimitConfig,

    pub limits: RequestLimits,

    /// How often elapsed rate-limit windows are purged
    pub sweep_interval: Duration,

    /// `User-Agent` sent to the remote
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            piston_url: "http://localhost:2000".to_string(),
            attempt_timeout: Duration::from_millis(10_000),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            health_timeout: Duration::from_millis(5_000),
            rate_limit: RateLimitConfig::default(),
            limits: RequestLimits::default(),
            sweep_interval: Duration::from_secs(60),
            user_agent: concat!("exec-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn new(piston_url: impl Into<String>) -> Self {
        Self {
            piston_url: piston_url.into(),
            ..Default::default()
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, window: Duration, max_requests: u32) -> Self {
        self.rate_limit = RateLimitConfig {
            window,
            max_requests,
        };
        self
    }

    pub fn with_limits(mut self, max_code_bytes: usize, max_input_bytes: usize) -> Self {
        self.limits = RequestLimits {
            max_code_bytes,
            max_input_bytes,
        };
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.piston_url.trim().is_empty() {
            return Err(Error::Configuration("piston url must not be empty".into()));
        }
        if self.max_retries == 0 {
            return Err(Error::Configuration("max retries must be at least 1".into()));
        }
        if self.attempt_timeout.is_zero() || self.health_timeout.is_zero() {
            return Err(Error::Configuration("timeouts must be non-zero".into()));
        }
        if self.rate_limit.window.is_zero() || self.rate_limit.max_requests == 0 {
            return Err(Error::Configuration(
                "rate limit window and ceiling must be non-zero".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::Configuration("sweep interval must be non-zero".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            attempt_timeout: self.attempt_timeout,
            backoff_base: self.backoff_base,
        }
    }

    /// The transport timeout sits just above the attempt timeout so the
    /// attempt timeout is the one that fires.
    pub fn piston_config(&self) -> PistonConfig {
        PistonConfig::new(self.piston_url.clone())
            .with_timeout(self.attempt_timeout + Duration::from_secs(1))
            .with_user_agent(self.user_agent.clone())
    }
}
