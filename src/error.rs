use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error_pages::ErrorPage;
use crate::flood::whole_seconds;
use crate::posting::PostingInterrupt;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Posting(#[from] PostingInterrupt),

    #[error("{}", .0.detail())]
    Page(ErrorPage),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ErrorPage> for AppError {
    fn from(page: ErrorPage) -> Self {
        AppError::Page(page)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound(_) => AppError::Page(ErrorPage::NotFound {
                message: Some(err.to_string()),
            }),
            StoreError::UsernameTaken(_) | StoreError::InvalidUsername => {
                AppError::BadRequest(err.to_string())
            }
            StoreError::SeedIo(_) | StoreError::SeedFormat(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Posting(interrupt) => match interrupt.retry_after {
                Some(wait) => {
                    let secs = whole_seconds(wait);
                    let mut response = (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({ "detail": interrupt.message, "retry_after": secs })),
                    )
                        .into_response();
                    response
                        .headers_mut()
                        .insert(RETRY_AFTER, HeaderValue::from(secs));
                    response
                }
                None => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "detail": interrupt.message })),
                )
                    .into_response(),
            },
            AppError::Page(page) => page.into_response(),
            AppError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Internal(detail) => {
                error!("{}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
