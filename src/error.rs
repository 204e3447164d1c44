//! Mimir error types

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for MimirError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status.as_u16() == 401 {
                return MimirError::AuthenticationFailed;
            }
            return MimirError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        MimirError::Http(err.to_string())
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
