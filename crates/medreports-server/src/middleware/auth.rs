use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use medreports_auth::jwt::validate_token;
use medreports_auth::session::{session_token, signin_path};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from the session token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Validate the session carried by `headers`, bearer header first, then
/// the session cookie.
pub fn session_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let cookie = headers.get(COOKIE).and_then(|v| v.to_str().ok());

    let token = session_token(authorization, cookie)
        .ok_or_else(|| ApiError::Unauthorized("missing session".to_string()))?;
    let claims = validate_token(token, &state.auth.decoding_key)?;

    Ok(AuthUser {
        user_id: claims.user_id()?,
        email: claims.email,
    })
}

/// The signed-in user, if any. Invalid sessions count as signed out.
pub fn optional_user(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    session_user(state, headers).ok()
}

/// JSON API guard: 401 without a valid session.
pub async fn require_api_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = session_user(&state, req.headers())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Page guard: redirect to sign-in, carrying the requested path back.
pub async fn require_page_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match session_user(&state, req.headers()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(_) => {
            Redirect::to(&signin_path(req.uri().path())).into_response()
        }
    }
}
