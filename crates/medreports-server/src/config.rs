use std::env;

use eyre::{WrapErr, eyre};

use medreports_ai::explain::{self, ExplanationConfig};
use medreports_ai::ocr::{self, OcrConfig};

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

/// Supabase project settings. Which keys are needed depends on the store
/// backend and on whether sign-in is used.
#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_key: Option<String>,
    pub jwt_secret: String,
}

/// Everything the service reads from the environment at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub public_url: Option<String>,
    pub store: StoreBackend,
    pub supabase: SupabaseConfig,
    pub ocr: OcrConfig,
    pub explanation: ExplanationConfig,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| eyre!("{key} must be set"));

        let store = match get("MEDREPORTS_STORE").as_deref() {
            None | Some("supabase") => StoreBackend::Supabase,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(eyre!(
                    "MEDREPORTS_STORE must be `supabase` or `memory`, got `{other}`"
                ));
            }
        };

        let supabase = SupabaseConfig {
            url: get("SUPABASE_URL"),
            anon_key: get("SUPABASE_ANON_KEY"),
            service_key: get("SUPABASE_SERVICE_KEY"),
            jwt_secret: require("SUPABASE_JWT_SECRET")?,
        };
        if store == StoreBackend::Supabase {
            if supabase.url.is_none() {
                return Err(eyre!("SUPABASE_URL must be set for the supabase store"));
            }
            if supabase.service_key.is_none() {
                return Err(eyre!("SUPABASE_SERVICE_KEY must be set for the supabase store"));
            }
        }

        let max_upload_bytes = match get("MEDREPORTS_MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse()
                .wrap_err_with(|| format!("MEDREPORTS_MAX_UPLOAD_BYTES is not a byte count: {v}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(ServerConfig {
            bind: get("MEDREPORTS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            public_url: get("MEDREPORTS_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            store,
            supabase,
            ocr: OcrConfig {
                base_url: get("TOGETHER_BASE_URL")
                    .unwrap_or_else(|| ocr::DEFAULT_BASE_URL.to_string()),
                api_key: require("TOGETHER_API_KEY")?,
                model: get("OCR_MODEL").unwrap_or_else(|| ocr::DEFAULT_MODEL.to_string()),
            },
            explanation: ExplanationConfig {
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| explain::DEFAULT_BASE_URL.to_string()),
                api_key: require("GEMINI_API_KEY")?,
                model: get("EXPLANATION_MODEL")
                    .unwrap_or_else(|| explain::DEFAULT_MODEL.to_string()),
            },
            max_upload_bytes,
        })
    }

    /// Cookies are marked `Secure` when the site is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.public_url
            .as_deref()
            .is_some_and(|u| u.starts_with("https://"))
    }
}
