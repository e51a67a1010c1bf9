use axum::extract::{Query, State};
use axum::http::header::{HOST, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{info, warn};

use medreports_auth::flows::PkcePair;
use medreports_auth::session::{
    SESSION_COOKIE, VERIFIER_COOKIE, clear_cookie, cookie_value, sanitize_redirect,
    session_cookie, verifier_cookie, with_redirect_to,
};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PROVIDER: &str = "google";

/// External origin of the site: the configured public URL, else the
/// request's own scheme and host.
pub fn public_base(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.public_url {
        return url.clone();
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}

fn with_cookies(mut response: Response, cookies: &[String]) -> Result<Response, ApiError> {
    for cookie in cookies {
        let value =
            HeaderValue::from_str(cookie).map_err(|e| ApiError::Internal(e.to_string()))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub provider: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Start the OAuth PKCE flow with the identity provider.
pub async fn signin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SignInQuery>,
) -> Result<Response, ApiError> {
    let gotrue = state
        .auth
        .gotrue
        .as_ref()
        .ok_or_else(|| ApiError::Internal("sign-in is not configured".to_string()))?;

    let redirect_to = sanitize_redirect(query.redirect_to.as_deref());
    let callback = with_redirect_to(
        &public_base(&state, &headers),
        "/auth/callback",
        &redirect_to,
    )?;
    let provider = query.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);

    let pkce = PkcePair::generate();
    let url = gotrue.authorize_url(provider, &callback, &pkce.challenge)?;

    info!(provider, "redirecting to identity provider");
    with_cookies(
        Redirect::to(&url).into_response(),
        &[verifier_cookie(&pkce.verifier, state.auth.secure_cookies)],
    )
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Finish sign-in: exchange the code for a session cookie, then send the
/// browser on to `redirectTo`. A failed exchange still redirects, without
/// a session.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let target = format!(
        "{}{}",
        public_base(&state, &headers),
        sanitize_redirect(query.redirect_to.as_deref())
    );

    let mut cookies = Vec::new();
    if let Some(code) = query.code.as_deref() {
        let verifier = headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|c| cookie_value(c, VERIFIER_COOKIE));

        match (state.auth.gotrue.as_ref(), verifier) {
            (Some(gotrue), Some(verifier)) => match gotrue.exchange_code(code, verifier).await {
                Ok(session) => {
                    info!("session established");
                    cookies.push(session_cookie(
                        &session.access_token,
                        session.expires_in,
                        state.auth.secure_cookies,
                    ));
                }
                Err(e) => warn!(error = %e, "code exchange failed"),
            },
            (None, _) => warn!("callback received but sign-in is not configured"),
            (_, None) => warn!("callback received without a code verifier"),
        }
        cookies.push(clear_cookie(VERIFIER_COOKIE));
    }

    with_cookies(Redirect::to(&target).into_response(), &cookies)
}

pub async fn signout() -> Result<Response, ApiError> {
    with_cookies(
        Redirect::to("/").into_response(),
        &[clear_cookie(SESSION_COOKIE)],
    )
}
