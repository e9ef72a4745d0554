use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::{
    download::{self, DEFAULT_FILENAME},
    error::{AppError, AppResult},
    state::AppState,
};

pub const CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub filename: Option<String>,
}

/// GET /download?url=<encoded-image-url>&filename=<name>
///
/// Streams nothing back until the whole image has been fetched and checked:
/// the body is capped by the image size limit and must be an image type.
/// The filename is sanitised before it reaches `Content-Disposition`.
pub async fn download_image(
    State(state): State<AppState>,
    Query(params): Query<DownloadQuery>,
) -> AppResult<Response> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(AppError::MissingParameter("URL"))?;
    let filename = params.filename.as_deref().unwrap_or(DEFAULT_FILENAME);

    let image = download::download(&state.guard, &state.fetcher, &url, filename).await?;
    tracing::info!(
        url = %url,
        bytes = image.body.len(),
        content_type = %image.content_type,
        "Relaying image download"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &image.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", image.filename),
        )
        .header(header::CONTENT_LENGTH, image.body.len())
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from(image.body))
        .map_err(|e| {
            tracing::error!(error = ?e, "Failed to build download response");
            AppError::Internal
        })
}
