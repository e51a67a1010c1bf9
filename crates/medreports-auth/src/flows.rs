use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::client::GoTrueClient;
use crate::error::AuthError;

const VERIFIER_LEN: usize = 64;

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(VERIFIER_LEN)
            .map(char::from)
            .collect();
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge: unpadded base64url of the verifier's SHA-256.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

impl GoTrueClient {
    /// Provider sign-in URL the browser is sent to.
    pub fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        challenge: &str,
    ) -> Result<String, AuthError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/authorize", self.auth_url),
            &[
                ("provider", provider),
                ("redirect_to", redirect_to),
                ("code_challenge", challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| AuthError::Config(format!("invalid auth url: {e}")))?;
        Ok(url.into())
    }

    /// Exchange an authorization code for a session.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, AuthError> {
        info!("exchanging authorization code");

        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.anon_key)
            .json(&PkceGrant {
                auth_code: code,
                code_verifier: verifier,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let err = exchange_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), "code exchange rejected");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

/// Tokens returned by a successful exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct GoTrueErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

fn exchange_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<GoTrueErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message))
        .unwrap_or_else(|| body.to_string());
    AuthError::ExchangeFailed { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_verifier_is_alphanumeric() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), VERIFIER_LEN);
        assert!(pair.verifier.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(pair.challenge, code_challenge(&pair.verifier));
    }

    #[test]
    fn authorize_url_carries_pkce_parameters() {
        let client = GoTrueClient::new(reqwest::Client::new(), "https://proj.supabase.co/", "anon");
        let url = client
            .authorize_url("google", "https://app.example/auth/callback?redirectTo=/analyze", "abc")
            .unwrap();
        assert!(url.starts_with("https://proj.supabase.co/auth/v1/authorize?provider=google&"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fapp.example%2Fauth%2Fcallback%3FredirectTo%3D%2Fanalyze"));
        assert!(url.contains("code_challenge=abc"));
        assert!(url.ends_with("code_challenge_method=s256"));
    }

    #[test]
    fn exchange_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"invalid flow state, no valid flow state found"}"#;
        match exchange_error(400, body) {
            AuthError::ExchangeFailed { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid flow state, no valid flow state found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(exchange_error(502, "bad gateway").to_string().contains("bad gateway"));
    }

    #[test]
    fn session_parses_token_response() {
        let body = r#"{"access_token":"jwt","token_type":"bearer","expires_in":3600,"expires_at":1700000000,"refresh_token":"r","user":{"id":"x"}}"#;
        let session: Session = serde_json::from_str(body).unwrap();
        assert_eq!(session.expires_in, 3600);
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
    }
}
