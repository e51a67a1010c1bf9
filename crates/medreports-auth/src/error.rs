use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing session")]
    MissingSession,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("code exchange failed ({status}): {message}")]
    ExchangeFailed { status: u16, message: String },

    #[error("identity provider request failed: {0}")]
    Http(String),

    #[error("auth config error: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Http(e.to_string())
    }
}
