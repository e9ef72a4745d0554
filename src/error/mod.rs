use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::guard::Rejection;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid image URL: {0}")]
    InvalidImageUrl(String),

    #[error("{0} is required")]
    MissingParameter(&'static str),

    #[error("Failed to fetch URL: upstream returned {0}")]
    UpstreamError(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Response exceeds the size limit")]
    TooLarge,

    #[error("No OG image found on this page")]
    NoImageFound,

    #[error("URL did not return an image")]
    NotAnImage,

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn invalid_url(reason: Rejection) -> Self {
        AppError::InvalidUrl(reason.to_string())
    }

    pub fn invalid_image_url(reason: Rejection) -> Self {
        AppError::InvalidImageUrl(reason.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl(_)
            | AppError::InvalidImageUrl(_)
            | AppError::MissingParameter(_)
            | AppError::UpstreamError(_)
            | AppError::TooLarge
            | AppError::NotAnImage => StatusCode::BAD_REQUEST,
            AppError::NoImageFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Transport failures are logged here and collapse to a bare 500 so no raw
/// client error text reaches the caller.
impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Upstream(status) => AppError::UpstreamError(status),
            FetchError::Timeout => AppError::Timeout,
            FetchError::TooLarge { .. } => AppError::TooLarge,
            FetchError::RedirectRejected => AppError::InvalidUrl("redirect not allowed".into()),
            FetchError::Transport(e) => {
                tracing::error!(error = ?e, "Outbound fetch failed");
                AppError::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal server error");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
