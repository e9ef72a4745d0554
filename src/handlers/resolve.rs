use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::OgMetadata;
use crate::og;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub url: Option<String>,
}

/// GET /resolve?url=<encoded-url>
///
/// Returns the page's Open Graph image (absolute, guard-checked) together with
/// its title and description. Nothing is cached.
pub async fn resolve_og(
    State(state): State<AppState>,
    Query(params): Query<ResolveQuery>,
) -> AppResult<Json<OgMetadata>> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(AppError::MissingParameter("URL"))?;

    let meta = og::resolve(&state.guard, &state.fetcher, &url).await?;
    tracing::info!(source = %meta.source_url, image = %meta.image_url, "Resolved OG image");

    Ok(Json(meta))
}
