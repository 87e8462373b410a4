use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog client id/secret not configured")]
    MissingCredentials,

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog {context} failed: {status} - {body}")]
    Status {
        context: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl CatalogError {
    /// Transport failures and 5xx answers are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::MissingCredentials => false,
            CatalogError::Transport(_) => true,
            CatalogError::Status { status, .. } => status.is_server_error(),
        }
    }
}
