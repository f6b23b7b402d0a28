//! # Execution Gateway
//!
//! Accepts untrusted source code from authenticated callers and forwards it to
//! a remote sandboxed execution service. Requests are rate limited per caller
//! and validated before anything leaves the process; delivery is retried with
//! exponential backoff; results are normalized into one client-safe shape.

mod config;
mod error;
mod executor;
mod health;
mod languages;
mod normalizer;
mod rate_limit;
mod service;
mod types;
mod validator;

#[cfg(test)]
mod tests;

pub use config::GatewayConfig;
pub use error::{Error, INVALID_CODE_MESSAGE, RATE_LIMITED_MESSAGE, UNAVAILABLE_MESSAGE};
pub use executor::{RemoteExecutor, RetryPolicy, RetryingExecutor};
pub use health::{HealthProber, HealthReport, HealthStatus, HEALTH_ERROR_MESSAGE};
pub use languages::{LanguageProfile, LanguageRegistry};
pub use normalizer::{failure, normalize};
pub use rate_limit::{
    spawn_sweeper, Admission, FixedWindowLimiter, Quota, RateLimitConfig, RateLimiter,
};
pub use service::{Executed, ExecutionGateway};
pub use types::{
    AttemptOutcome, ExecutionAttempt, ExecutionFailure, ExecutionOutput, ExecutionRequest,
    FailureKind, NormalizedResponse, RemoteResult, RequesterId,
};
pub use validator::{validate, RequestLimits};

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;
