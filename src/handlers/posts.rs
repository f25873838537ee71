use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::info;

use crate::acl::PermissionOracle;
use crate::clock::Clock;
use crate::error::AppError;
use crate::error_pages::ErrorPage;
use crate::metrics::{POSTING_LATENCY, POSTS_ACCEPTED, REQUEST_TOTAL};
use crate::models::{Capability, NewPostRequest, Post, ThreadId, UserId};
use crate::posting::PostingContext;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-forum-user";

// Who is posting. Sessions live outside this service, so the id comes in a header.
pub fn acting_user(headers: &HeaderMap) -> Result<UserId, AppError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ErrorPage::permission_denied("You have to sign in to post.").into())
}

pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<ThreadId>,
    headers: HeaderMap,
    Json(payload): Json<NewPostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    REQUEST_TOTAL.inc();
    // observed on drop, so rejected attempts are timed too
    let _latency = POSTING_LATENCY.start_timer();

    let user_id = acting_user(&headers)?;
    let now = state.clock.now();

    // pipeline runs while the store holds this user's entry
    state.users.update(user_id, |user| {
        if let Some(message) = &user.ban_message {
            return Err(AppError::from(ErrorPage::Banned {
                message: message.clone(),
            }));
        }

        let can_omit_flood_protection = state
            .acl
            .has_capability(user, Capability::CanOmitFloodProtection);
        let mut ctx = PostingContext {
            user,
            content: &payload.content,
            now,
            can_omit_flood_protection,
        };
        state.pipeline.run(&mut ctx).map_err(AppError::from)
    })??;

    let post = state
        .users
        .add_post(thread_id, user_id, payload.content.trim().to_string(), now);
    POSTS_ACCEPTED.inc();
    info!("User {} posted {} in thread {}", user_id, post.id, thread_id);

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<ThreadId>,
) -> Json<Vec<Post>> {
    Json(state.users.thread_posts(thread_id))
}
