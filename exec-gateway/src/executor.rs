use async_trait::async_trait;
use piston_client::{ExecuteRequest, ExecuteResponse, PistonClient, Runtime, SourceFile};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    languages::LanguageProfile,
    types::{AttemptOutcome, ExecutionAttempt, RemoteResult},
};

/// The remote service that actually runs code
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Submit one program for execution
    async fn submit(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, piston_client::Error>;

    /// List the runtimes the service has installed
    async fn runtimes(&self) -> Result<Vec<Runtime>, piston_client::Error>;
}

#[async_trait]
impl RemoteExecutor for PistonClient {
    async fn submit(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, piston_client::Error> {
        self.execute(request).await
    }

    async fn runtimes(&self) -> Result<Vec<Runtime>, piston_client::Error> {
        PistonClient::runtimes(self).await
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Hard ceiling on each attempt
    pub attempt_timeout: Duration,
    /// Delay before the first retry; doubles for each one after
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based): base * 2^(attempt-1)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// Delivers executions to the remote with bounded, sequential retries
pub struct RetryingExecutor {
    remote: Arc<dyn RemoteExecutor>,
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(remote: Arc<dyn RemoteExecutor>, policy: RetryPolicy) -> Self {
        Self { remote, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the wire request for a profile
    pub fn build_request(profile: &LanguageProfile, code: &str, stdin: &str) -> ExecuteRequest {
        ExecuteRequest {
            language: profile.runtime_name.clone(),
            version: profile.runtime_version.clone(),
            files: vec![SourceFile {
                name: profile.source_file_name.clone(),
                content: code.to_string(),
            }],
            stdin: stdin.to_string(),
            run_memory_limit: Some(profile.memory_limit_bytes()),
        }
    }

    /// Run the program remotely.
    ///
    /// Transient failures are retried up to the policy limit with exponential
    /// backoff between attempts. A rejection by the remote returns at once.
    /// Cancelling `cancel` abandons the in-flight attempt or backoff.
    pub async fn execute(
        &self,
        profile: &LanguageProfile,
        code: &str,
        stdin: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteResult, Error> {
        let request = Self::build_request(profile, code, stdin);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_cause = None;

        for attempt in 1..=max_attempts {
            let started_at = Instant::now();
            let record = ExecutionAttempt {
                attempt,
                started_at,
                outcome: self.attempt_once(&request, cancel).await?,
            };
            let attempt_ms = record.started_at.elapsed().as_millis() as u64;

            match record.outcome {
                AttemptOutcome::Success(result) => {
                    if record.attempt > 1 {
                        info!(attempt = record.attempt, "execution succeeded after retry");
                    }
                    debug!(attempt = record.attempt, attempt_ms, "remote execution completed");
                    return Ok(result);
                }
                AttemptOutcome::Fatal(cause) => {
                    warn!(attempt = record.attempt, error = %cause, "remote executor rejected request");
                    return Err(cause);
                }
                AttemptOutcome::Transient(cause) => {
                    warn!(
                        attempt = record.attempt,
                        max_attempts,
                        attempt_ms,
                        error = %cause,
                        "execution attempt failed"
                    );
                    last_cause = Some(cause);

                    if attempt < max_attempts {
                        let delay = self.policy.backoff_for(attempt);
                        debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(Error::Cancelled),
                            _ = sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Err(Error::ExecutionFailed {
            attempts: max_attempts,
            last_cause: Box::new(
                last_cause.unwrap_or_else(|| Error::Internal("no attempt was made".to_string())),
            ),
        })
    }

    async fn attempt_once(
        &self,
        request: &ExecuteRequest,
        cancel: &CancellationToken,
    ) -> Result<AttemptOutcome, Error> {
        let call = timeout(self.policy.attempt_timeout, self.remote.submit(request));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            outcome = call => Ok(match outcome {
                Err(_) => AttemptOutcome::Transient(Error::RemoteUnavailable(format!(
                    "attempt timed out after {}ms",
                    self.policy.attempt_timeout.as_millis()
                ))),
                Ok(result) => classify(result),
            }),
        }
    }
}

fn classify(result: Result<ExecuteResponse, piston_client::Error>) -> AttemptOutcome {
    match result {
        Ok(response) => AttemptOutcome::Success(response.into()),
        Err(e) if e.is_transient() => AttemptOutcome::Transient(Error::RemoteUnavailable(e.to_string())),
        Err(piston_client::Error::Api {
            status_code,
            message,
        }) => AttemptOutcome::Fatal(Error::RemoteRejected {
            status_code,
            message,
        }),
        Err(e) => AttemptOutcome::Fatal(Error::Internal(e.to_string())),
    }
}
