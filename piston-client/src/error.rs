use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures, undecodable bodies, 5xx, 408 and 429 are transient.
    /// Any other 4xx is a deterministic rejection of the request.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::HttpClient(_) => true,
            Error::Api { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            Error::Configuration(_) => false,
        }
    }

    /// Status code of a rejected request, if the remote answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::HttpClient(e) => e.status().map(|s| s.as_u16()),
            Error::Configuration(_) => None,
        }
    }
}
