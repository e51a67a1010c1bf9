use crate::error::AuthError;

/// Handle on a Supabase project's auth (GoTrue) endpoints.
#[derive(Clone)]
pub struct GoTrueClient {
    pub(crate) http: reqwest::Client,
    pub(crate) auth_url: String,
    pub(crate) anon_key: String,
}

impl GoTrueClient {
    pub fn new(http: reqwest::Client, supabase_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            http,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }
}

/// Build a GoTrue client with a default `reqwest::Client`.
pub fn build_client(supabase_url: &str, anon_key: &str) -> Result<GoTrueClient, AuthError> {
    if supabase_url.is_empty() {
        return Err(AuthError::Config("SUPABASE_URL is empty".to_string()));
    }
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| AuthError::Config(e.to_string()))?;
    Ok(GoTrueClient::new(http, supabase_url, anon_key))
}
