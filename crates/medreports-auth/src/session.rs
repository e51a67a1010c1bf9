//! Session token lookup, cookie building and redirect sanitizing.

use reqwest::Url;

use crate::error::AuthError;

/// Cookie carrying the Supabase access token.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Short-lived cookie carrying the PKCE verifier between sign-in and
/// callback.
pub const VERIFIER_COOKIE: &str = "sb-code-verifier";

const VERIFIER_MAX_AGE_SECS: u64 = 600;

/// Query parameter carrying the page to return to after sign-in.
pub const REDIRECT_PARAM: &str = "redirectTo";

const LOCAL_ORIGIN: &str = "http://localhost";

/// The token of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Value of the cookie called `name` in a `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

/// Session token from either header, bearer first.
pub fn session_token<'a>(
    authorization: Option<&'a str>,
    cookie_header: Option<&'a str>,
) -> Option<&'a str> {
    authorization
        .and_then(bearer_token)
        .or_else(|| cookie_header.and_then(|c| cookie_value(c, SESSION_COOKIE)))
}

fn cookie(name: &str, value: &str, path: &str, max_age: u64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path={path}; Max-Age={max_age}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value storing the session token.
pub fn session_cookie(token: &str, max_age: u64, secure: bool) -> String {
    cookie(SESSION_COOKIE, token, "/", max_age, secure)
}

/// `Set-Cookie` value storing the PKCE verifier.
pub fn verifier_cookie(verifier: &str, secure: bool) -> String {
    cookie(VERIFIER_COOKIE, verifier, "/", VERIFIER_MAX_AGE_SECS, secure)
}

/// `Set-Cookie` value that removes the cookie called `name`.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Reduce a requested redirect target to a site-relative path. Anything
/// that could leave the site (absolute URLs, `//host`, `/\host`) becomes
/// `/`.
pub fn sanitize_redirect(target: Option<&str>) -> String {
    match target {
        Some(t)
            if t.starts_with('/')
                && !t.starts_with("//")
                && !t.starts_with("/\\")
                && !t.chars().any(char::is_control) =>
        {
            t.to_string()
        }
        _ => "/".to_string(),
    }
}

/// `{base}{path}?redirectTo=<target>`, with the target percent-encoded so
/// its own query string comes back intact.
pub fn with_redirect_to(base: &str, path: &str, target: &str) -> Result<String, AuthError> {
    let url = Url::parse_with_params(&format!("{base}{path}"), &[(REDIRECT_PARAM, target)])
        .map_err(|e| AuthError::Config(format!("invalid redirect base {base}: {e}")))?;
    Ok(url.into())
}

/// Site-relative sign-in path that returns to `target` afterwards.
pub fn signin_path(target: &str) -> String {
    with_redirect_to(LOCAL_ORIGIN, "/signin", target)
        .ok()
        .and_then(|url| url.strip_prefix(LOCAL_ORIGIN).map(str::to_string))
        .unwrap_or_else(|| "/signin".to_string())
}
