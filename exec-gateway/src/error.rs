use std::time::Duration;
use thiserror::Error;

use crate::types::FailureKind;

/// Client-facing message for requests the remote executor refused.
pub const INVALID_CODE_MESSAGE: &str = "Invalid code or input";

/// Client-facing message for every other remote or internal failure.
pub const UNAVAILABLE_MESSAGE: &str = "Code execution service temporarily unavailable";

/// Client-facing message for quota rejections.
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many code execution requests, please try again later.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit of {limit} requests exceeded, retry after {}ms", .retry_after.as_millis())]
    RateLimited { limit: u32, retry_after: Duration },

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Remote executor rejected request: {status_code} - {message}")]
    RemoteRejected { status_code: u16, message: String },

    #[error("Remote executor unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Execution failed after {attempts} attempts: {last_cause}")]
    ExecutionFailed {
        attempts: u32,
        #[source]
        last_cause: Box<Error>,
    },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The message that may be shown to the caller.
    ///
    /// Only caller errors keep their specific reason. Everything that
    /// originated in the remote executor or in the gateway itself collapses
    /// to one of two fixed strings.
    pub fn client_message(&self) -> String {
        match self {
            Error::InvalidInput(reason) => reason.clone(),
            Error::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            Error::RemoteRejected { .. } => INVALID_CODE_MESSAGE.to_string(),
            _ => UNAVAILABLE_MESSAGE.to_string(),
        }
    }

    /// Failure class used to pick the transport status for this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::InvalidInput(_) | Error::UnsupportedLanguage(_) => FailureKind::Invalid,
            Error::RemoteRejected { .. } => FailureKind::Rejected,
            _ => FailureKind::Unavailable,
        }
    }

    /// Errors caused by the caller rather than by the remote or the gateway.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::RateLimited { .. })
    }
}
