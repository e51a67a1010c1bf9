use reqwest::{Method, RequestBuilder};

use crate::error::StorageError;

/// PostgREST endpoint of a Supabase project.
///
/// The key is sent both as `apikey` and as the bearer token. The server
/// uses the service key, so every query scoped to a user must filter on
/// `user_id` itself.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(http: reqwest::Client, supabase_url: &str, api_key: &str) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    pub(crate) fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Build a client with a default `reqwest::Client`.
pub fn build_client(supabase_url: &str, api_key: &str) -> Result<PostgrestClient, StorageError> {
    if supabase_url.is_empty() {
        return Err(StorageError::Config("SUPABASE_URL is empty".to_string()));
    }
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| StorageError::Config(e.to_string()))?;
    Ok(PostgrestClient::new(http, supabase_url, api_key))
}
