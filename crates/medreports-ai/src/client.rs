//! Shared HTTP plumbing for the OCR and explanation services.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AiError;

const USER_AGENT: &str = concat!("medreports/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for all model calls.
///
/// No request timeout is set; calls wait as long as the transport allows.
pub fn build_http_client() -> Result<reqwest::Client, AiError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AiError::Config(e.to_string()))
}

/// Error envelope shared by the OCR and explanation APIs:
/// `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Turn a non-success response body into an [`AiError::Remote`], preferring
/// the service's own error message over the HTTP reason phrase.
pub fn remote_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|detail| detail.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    AiError::Remote {
        status: status.as_u16(),
        message,
    }
}

/// Read a response: non-2xx becomes [`AiError::Remote`], a body that does
/// not decode as `T` becomes [`AiError::ResponseShape`].
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(remote_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| AiError::ResponseShape(e.to_string()))
}
