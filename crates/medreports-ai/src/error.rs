use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status. `message` is the
    /// service's own error message when it sent one.
    #[error("API Error: {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid response format from API: {0}")]
    ResponseShape(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Http(e.to_string())
    }
}
