use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::error::AppError;
use crate::metrics::USERS;
use crate::models::{NewUserRequest, UserId, UserRecord};
use crate::state::AppState;

pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    let user = state.users.create_user(&payload.username, state.clock.now())?;
    USERS.set(state.users.user_count() as f64);
    info!("Registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserRecord>, AppError> {
    Ok(Json(state.users.get(user_id)?))
}
