//! Forum posting service: posting pipeline with per-user flood protection,
//! plus the forum's error pages.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

pub mod acl;
pub mod clock;
pub mod config;
pub mod csrf;
pub mod error;
pub mod error_pages;
pub mod flood;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod posting;
pub mod state;
pub mod store;

use crate::error_pages::render_error_pages;
use crate::handlers::*;
use crate::state::AppState;

// Router with all routes, guards and error page rendering
pub fn build_router(state: Arc<AppState>) -> Router {
    let prefix = state.forum_prefix.clone();
    let error_pages = state.error_pages.clone();

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/users", post(create_user_handler))
        .route("/api/users/{user_id}", get(get_user_handler))
        .route(
            "/api/threads/{thread_id}/posts",
            get(list_posts_handler).post(create_post_handler),
        )
        .route(&format!("{prefix}/"), get(forum_index_handler))
        .route(&format!("{prefix}/threads/{{thread_id}}"), get(thread_page_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(middleware::from_fn_with_state(state.clone(), csrf::csrf_guard))
        .layer(middleware::from_fn_with_state(error_pages, render_error_pages))
        .with_state(state)
}
