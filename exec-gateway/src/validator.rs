use crate::{error::Error, languages::LanguageRegistry, types::ExecutionRequest};

/// Size ceilings applied before anything leaves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    /// Maximum source size in bytes
    pub max_code_bytes: usize,
    /// Maximum stdin size in bytes
    pub max_input_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_code_bytes: 50_000,
            max_input_bytes: 10_000,
        }
    }
}

/// Check a request against the limits and the registry.
///
/// Rules run in a fixed order and the first failure wins. This function does
/// no I/O and touches no shared state.
pub fn validate(
    request: &ExecutionRequest,
    registry: &LanguageRegistry,
    limits: &RequestLimits,
) -> Result<(), Error> {
    if request.code.is_empty() {
        return Err(Error::InvalidInput("missing code".to_string()));
    }
    if request.code.len() > limits.max_code_bytes {
        return Err(Error::InvalidInput("code too large".to_string()));
    }
    if !registry.supports(&request.language) {
        return Err(Error::InvalidInput("unsupported language".to_string()));
    }
    if request.stdin().len() > limits.max_input_bytes {
        return Err(Error::InvalidInput("input too large".to_string()));
    }
    Ok(())
}
