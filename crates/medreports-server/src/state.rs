use std::sync::Arc;

use medreports_ai::explain::Explainer;
use medreports_ai::ocr::TextExtractor;
use medreports_auth::client::GoTrueClient;
use medreports_auth::jsonwebtoken::DecodingKey;
use medreports_render::render::Renderer;
use medreports_storage::store::ReportStore;

/// Session validation and sign-in settings.
pub struct AuthSettings {
    pub decoding_key: DecodingKey,
    /// `None` when the anon key is not configured; sign-in is then
    /// unavailable but existing sessions still validate.
    pub gotrue: Option<GoTrueClient>,
    pub secure_cookies: bool,
}

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub explainer: Arc<dyn Explainer>,
    pub renderer: Arc<Renderer>,
    pub auth: Arc<AuthSettings>,
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
}
