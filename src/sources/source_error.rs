use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("unexpected data shape: {0}")]
    UnexpectedShape(String),

    #[error("state not configured for this source: {0}")]
    UnsupportedState(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl SourceError {
    /// Timeouts, connection failures, 5xx and 429 are worth another attempt.
    /// Other 4xx responses and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Timeout(_) | SourceError::Connect(_) | SourceError::Transport(_) => true,
            SourceError::Status { status, .. } => *status >= 500 || *status == 429,
            SourceError::Decode(_)
            | SourceError::UnexpectedShape(_)
            | SourceError::UnsupportedState(_)
            | SourceError::Client(_) => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_connect() {
            SourceError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else if e.is_builder() {
            SourceError::Client(e.to_string())
        } else {
            // Resets and other mid-flight failures.
            SourceError::Transport(e.to_string())
        }
    }
}
