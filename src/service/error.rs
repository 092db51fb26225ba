use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("not signed in")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed response: {0}")]
    InvalidPayload(String),
    #[error("unknown time filter: {0}")]
    UnknownTimeFilter(String),
    #[error("failed to resolve time range")]
    Time(#[from] jiff::Error),
}

impl ServiceError {
    /// Transient failures worth surfacing as "try again".
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
