//! Error pages and their dispatch.
//!
//! Handlers return an [`ErrorPage`] as a bare response carrying the page in
//! its extensions. [`render_error_pages`] then picks the final form: a JSON
//! `{"detail": ...}` body for API calls, the forum's own page for requests
//! inside the forum prefix, or the site's custom page for anything else.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::metrics::ERROR_PAGES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialAuthError {
    AuthFailed { backend: String },
    WrongBackend { backend: String },
    NotAllowedToDisconnect { backend: String },
    FailedMessage { backend: String, message: String },
    Banned { backend: String, message: String },
}

impl SocialAuthError {
    pub fn backend(&self) -> &str {
        match self {
            SocialAuthError::AuthFailed { backend }
            | SocialAuthError::WrongBackend { backend }
            | SocialAuthError::NotAllowedToDisconnect { backend }
            | SocialAuthError::FailedMessage { backend, .. }
            | SocialAuthError::Banned { backend, .. } => backend,
        }
    }

    fn message(&self) -> String {
        let name = backend_display_name(self.backend());
        match self {
            SocialAuthError::AuthFailed { .. } => {
                format!("Unexpected problem has been encountered during sign in with {name}.")
            }
            SocialAuthError::WrongBackend { .. } => {
                format!("Sign in with {name} was started with a different provider.")
            }
            SocialAuthError::NotAllowedToDisconnect { .. } => format!(
                "You can't disconnect your {name} account, because it's the only way you can sign in."
            ),
            SocialAuthError::FailedMessage { message, .. } | SocialAuthError::Banned { message, .. } => {
                message.clone()
            }
        }
    }
}

/// Known social auth backend ids and how they're shown to users.
pub fn backend_display_name(backend: &str) -> &str {
    match backend {
        "github" => "GitHub",
        "google-oauth2" => "Google",
        "facebook" => "Facebook",
        "twitter" => "Twitter",
        "discord" => "Discord",
        "gitlab" => "GitLab",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPage {
    Banned { message: String },
    PermissionDenied { message: Option<String> },
    NotFound { message: Option<String> },
    NotAllowed,
    CsrfFailure,
    Social(SocialAuthError),
}

impl ErrorPage {
    pub fn not_found() -> Self {
        ErrorPage::NotFound { message: None }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ErrorPage::PermissionDenied {
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorPage::NotFound { .. } => StatusCode::NOT_FOUND,
            ErrorPage::NotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorPage::Banned { .. }
            | ErrorPage::PermissionDenied { .. }
            | ErrorPage::CsrfFailure
            | ErrorPage::Social(_) => StatusCode::FORBIDDEN,
        }
    }

    fn title(&self) -> String {
        match self {
            ErrorPage::Banned { .. } | ErrorPage::Social(SocialAuthError::Banned { .. }) => {
                "You are banned".to_string()
            }
            ErrorPage::PermissionDenied { .. } => "Page not available".to_string(),
            ErrorPage::NotFound { .. } => "Page not found".to_string(),
            ErrorPage::NotAllowed => "Wrong way".to_string(),
            ErrorPage::CsrfFailure => "Request blocked".to_string(),
            ErrorPage::Social(err) => {
                format!("{}: sign in failed", backend_display_name(err.backend()))
            }
        }
    }

    // Plain text used in JSON bodies and under the page title
    pub fn detail(&self) -> String {
        match self {
            ErrorPage::Banned { message } => message.clone(),
            ErrorPage::PermissionDenied { message } => message
                .clone()
                .unwrap_or_else(|| "You don't have permission to access this page.".to_string()),
            ErrorPage::NotFound { message } => message.clone().unwrap_or_else(|| {
                "The link you followed is incorrect or the page has been moved or deleted.".to_string()
            }),
            ErrorPage::NotAllowed => {
                "This page can't be accessed using the method your request used.".to_string()
            }
            ErrorPage::CsrfFailure => {
                "Your request was blocked because it couldn't be verified. Reload the page and try again."
                    .to_string()
            }
            ErrorPage::Social(err) => err.message(),
        }
    }

    fn css_class(&self) -> String {
        match self {
            ErrorPage::Banned { .. } => "page-error-banned".to_string(),
            ErrorPage::CsrfFailure => "page-error-csrf".to_string(),
            ErrorPage::Social(_) => "page-error-social".to_string(),
            other => format!("page-error-{}", other.status().as_u16()),
        }
    }

    pub fn render_html(&self) -> String {
        let title = escape_html(&self.title());
        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
             <div class=\"page page-error {class}\">\n<div class=\"container\">\n\
             <h1>{title}</h1>\n<p>{detail}</p>\n</div>\n</div>\n</body>\n</html>\n",
            class = self.css_class(),
            detail = escape_html(&self.detail()),
        )
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.detail()).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

// API paths and XHR calls get JSON
pub fn wants_json(path: &str, headers: &HeaderMap) -> bool {
    path == "/api"
        || path.starts_with("/api/")
        || headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Decides which rendering an error page gets for a given request.
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
    forum_prefix: String,
    site_403: Option<String>,
    site_404: Option<String>,
}

impl ErrorPages {
    pub fn new(forum_prefix: &str) -> Self {
        Self {
            forum_prefix: forum_prefix.trim_end_matches('/').to_string(),
            site_403: None,
            site_404: None,
        }
    }

    pub fn with_site_403(mut self, html: impl Into<String>) -> Self {
        self.site_403 = Some(html.into());
        self
    }

    pub fn with_site_404(mut self, html: impl Into<String>) -> Self {
        self.site_404 = Some(html.into());
        self
    }

    pub fn is_forum_request(&self, path: &str) -> bool {
        let prefix = self.forum_prefix.as_str();
        prefix.is_empty()
            || path == prefix
            || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
    }

    fn site_page(&self, page: &ErrorPage) -> Option<&str> {
        match page {
            ErrorPage::PermissionDenied { .. } | ErrorPage::Banned { .. } => self.site_403.as_deref(),
            ErrorPage::NotFound { .. } => self.site_404.as_deref(),
            _ => None,
        }
    }

    pub fn dispatch(&self, path: &str, wants_json: bool, page: &ErrorPage) -> Response {
        let status = page.status();
        ERROR_PAGES.with_label_values(&[status.as_str()]).inc();

        if wants_json {
            return (status, Json(json!({ "detail": page.detail() }))).into_response();
        }

        if !self.is_forum_request(path) {
            if let Some(html) = self.site_page(page) {
                debug!("Serving site error page {} for {}", status, path);
                return (status, Html(html.to_string())).into_response();
            }
        }

        (status, Html(page.render_html())).into_response()
    }
}

pub async fn render_error_pages(
    State(pages): State<Arc<ErrorPages>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let json = wants_json(&path, request.headers());

    let response = next.run(request).await;
    match response.extensions().get::<ErrorPage>().cloned() {
        Some(page) => pages.dispatch(&path, json, &page),
        None => response,
    }
}
