use std::time::Duration;

use crate::{
    error::Error,
    languages::LanguageProfile,
    types::{ExecutionFailure, ExecutionOutput, NormalizedResponse, RemoteResult},
};

/// Shape an execution outcome into the client contract
pub fn normalize(
    outcome: Result<RemoteResult, Error>,
    profile: &LanguageProfile,
    elapsed: Duration,
) -> NormalizedResponse {
    match outcome {
        Ok(result) => NormalizedResponse::Success(ExecutionOutput {
            success: true,
            stdout: result.stdout,
            stderr: result.stderr,
            compile_output: result.compile_stdout,
            compile_error: result.compile_stderr,
            exit_code: result.exit_code,
            signal: result.signal,
            execution_time: millis(elapsed),
            language: profile.language_id.clone(),
            version: profile.runtime_version.clone(),
        }),
        Err(e) => failure(&e, elapsed),
    }
}

/// Client-safe failure envelope; the internal cause is not carried over
pub fn failure(error: &Error, elapsed: Duration) -> NormalizedResponse {
    NormalizedResponse::Failure(ExecutionFailure {
        success: false,
        error: error.client_message(),
        execution_time: millis(elapsed),
        kind: error.failure_kind(),
    })
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
