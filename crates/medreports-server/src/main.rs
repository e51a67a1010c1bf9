use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use medreports_ai::client::build_http_client;
use medreports_ai::explain::GeminiExplainer;
use medreports_ai::ocr::TogetherOcr;
use medreports_auth::jwt::decoding_key;
use medreports_render::render::Renderer;
use medreports_storage::memory::MemoryStore;
use medreports_storage::store::ReportStore;
use medreports_storage::supabase::SupabaseStore;

mod config;
mod error;
mod middleware;
mod pipeline;
mod router;
mod routes;
mod state;
mod upload;

use config::{ServerConfig, StoreBackend};
use state::{AppState, AuthSettings};

fn build_store(config: &ServerConfig) -> eyre::Result<Arc<dyn ReportStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; reports are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Supabase => {
            let url = config.supabase.url.as_deref().unwrap_or_default();
            let key = config.supabase.service_key.as_deref().unwrap_or_default();
            let client = medreports_storage::client::build_client(url, key)?;
            Ok(Arc::new(SupabaseStore::new(client)))
        }
    }
}

fn build_auth(config: &ServerConfig) -> eyre::Result<AuthSettings> {
    let gotrue = match (&config.supabase.url, &config.supabase.anon_key) {
        (Some(url), Some(anon_key)) => Some(medreports_auth::client::build_client(url, anon_key)?),
        _ => {
            tracing::warn!("SUPABASE_URL or SUPABASE_ANON_KEY unset; sign-in is disabled");
            None
        }
    };
    Ok(AuthSettings {
        decoding_key: decoding_key(&config.supabase.jwt_secret),
        gotrue,
        secure_cookies: config.secure_cookies(),
    })
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = ServerConfig::from_env()?;
    let http = build_http_client()?;

    let state = AppState {
        store: build_store(&config)?,
        extractor: Arc::new(TogetherOcr::new(http.clone(), config.ocr.clone())),
        explainer: Arc::new(GeminiExplainer::new(http, config.explanation.clone())),
        renderer: Arc::new(Renderer::new()?),
        auth: Arc::new(build_auth(&config)?),
        public_url: config.public_url.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = router::build_router(state);

    if env::var_os("AWS_LAMBDA_RUNTIME_API").is_some() {
        tracing::info!("serving through the Lambda runtime");
        return lambda_http::run(app).await.map_err(|e| eyre::eyre!(e));
    }

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(addr = %config.bind, store = ?config.store, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
