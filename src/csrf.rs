use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header::COOKIE},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::AppError;
use crate::error_pages::ErrorPage;
use crate::state::AppState;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

// Double-submit check: header token must equal the cookie token
pub fn token_matches(headers: &HeaderMap) -> bool {
    let cookie = cookie_value(headers, CSRF_COOKIE);
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    matches!((cookie, header), (Some(c), Some(h)) if !c.is_empty() && c == h)
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

pub async fn csrf_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.csrf_enabled && !is_safe(request.method()) && !token_matches(request.headers()) {
        warn!("Blocked {} {} without a valid CSRF token", request.method(), request.uri().path());
        return Err(ErrorPage::CsrfFailure.into());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_must_match_cookie() {
        let mut headers = HeaderMap::new();
        assert!(!token_matches(&headers));

        headers.insert(COOKIE, "theme=dark; csrftoken=abc123".parse().unwrap());
        assert!(!token_matches(&headers));

        headers.insert(CSRF_HEADER, "nope".parse().unwrap());
        assert!(!token_matches(&headers));

        headers.insert(CSRF_HEADER, "abc123".parse().unwrap());
        assert!(token_matches(&headers));
    }

    #[test]
    fn empty_tokens_never_match() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "csrftoken=".parse().unwrap());
        headers.insert(CSRF_HEADER, "".parse().unwrap());
        assert!(!token_matches(&headers));
    }
}
