use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
    #[error("timed out fetching {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body: {0}")]
    Body(String),
}

impl FetchError {
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request timed out")]
    Timeout,
    #[error("inference service unreachable: {0}")]
    Network(String),
    #[error("inference service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else {
            InferenceError::Network(e.to_string())
        }
    }
}

/// Anything that stops the pipeline before a result exists.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl AnalysisError {
    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::InvalidRequest(_) => "validate",
            AnalysisError::Fetch(_) => "fetch",
            AnalysisError::Inference(_) => "inference",
        }
    }
}
