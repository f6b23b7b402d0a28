use piston_client::ExecuteResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use crate::error::Error;

/// Authenticated identity of the caller, as supplied by the auth layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Code execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Platform language identifier, e.g. `python` or `cpp`
    pub language: String,
    /// Source code to execute
    pub code: String,
    /// Input data for the program
    #[serde(default)]
    pub input: Option<String>,
    /// Who is asking
    pub requester: RequesterId,
}

impl ExecutionRequest {
    pub fn stdin(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }
}

/// Output of a completed remote execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResult {
    pub stdout: String,
    pub stderr: String,
    pub compile_stdout: String,
    pub compile_stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
}

impl From<ExecuteResponse> for RemoteResult {
    fn from(response: ExecuteResponse) -> Self {
        let run = response.run.unwrap_or_default();
        let compile = response.compile.unwrap_or_default();

        Self {
            stdout: run.stdout.unwrap_or_default(),
            stderr: run.stderr.unwrap_or_default(),
            compile_stdout: compile.stdout.unwrap_or_default(),
            compile_stderr: compile.stderr.unwrap_or_default(),
            exit_code: run.code,
            signal: run.signal,
        }
    }
}

/// Classified result of one delivery attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(RemoteResult),
    /// May succeed on retry
    Transient(Error),
    /// Will not change on retry
    Fatal(Error),
}

#[derive(Debug)]
pub struct ExecutionAttempt {
    pub attempt: u32,
    pub started_at: Instant,
    pub outcome: AttemptOutcome,
}

/// The only shape that crosses the boundary back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedResponse {
    Success(ExecutionOutput),
    Failure(ExecutionFailure),
}

impl NormalizedResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, NormalizedResponse::Success(_))
    }

    /// Wall-clock milliseconds spent on the request
    pub fn execution_time(&self) -> u64 {
        match self {
            NormalizedResponse::Success(output) => output.execution_time,
            NormalizedResponse::Failure(failure) => failure.execution_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub compile_error: String,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub execution_time: u64,
    pub language: String,
    pub version: String,
}

/// Why an execution failed, independent of the wording shown to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureKind {
    /// The request broke a validation rule
    Invalid,
    /// The remote executor refused the request
    Rejected,
    /// The remote was unreachable, timed out, or the gateway itself failed
    #[default]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub success: bool,
    pub error: String,
    pub execution_time: u64,
    #[serde(skip)]
    pub kind: FailureKind,
}

impl ExecutionFailure {
    /// Whether the remote executor refused the request as invalid
    pub fn is_rejection(&self) -> bool {
        self.kind == FailureKind::Rejected
    }
}
