//! OG Resolver: turns a page URL into the absolute, re-validated URL of its
//! social-preview image plus a title and description.

pub mod entities;
pub mod extract;

use url::Url;

use crate::error::{AppError, AppResult};
use crate::fetch::Fetcher;
use crate::guard::{Rejection, UrlGuard};
use crate::models::OgMetadata;

pub use entities::decode_html_entities;

pub const HTML_ACCEPT: &str = "text/html";
pub const DEFAULT_TITLE: &str = "Untitled";

/// Validate `source_url`, fetch the page under the HTML size limit and pull
/// its preview metadata out.
pub async fn resolve(guard: &UrlGuard, fetcher: &Fetcher, source_url: &str) -> AppResult<OgMetadata> {
    let source = guard.check(source_url).map_err(|reason| {
        tracing::debug!(url = %source_url, %reason, "Rejected source URL");
        AppError::invalid_url(reason)
    })?;

    let page = fetcher
        .fetch(&source, HTML_ACCEPT, fetcher.limits().max_html_bytes)
        .await?;
    let html = String::from_utf8_lossy(&page.body);

    extract_metadata(guard, &html, &source)
}

/// Pull preview metadata out of an already-fetched page.
///
/// The image URL found in the page is untrusted input in its own right: it is
/// resolved against `source` and then has to pass `guard` again.
pub fn extract_metadata(guard: &UrlGuard, html: &str, source: &Url) -> AppResult<OgMetadata> {
    let raw = extract::extract_raw(html);

    let candidate = raw.image.ok_or_else(|| {
        tracing::debug!(url = %source, "No og:image or twitter:image on page");
        AppError::NoImageFound
    })?;
    let candidate = decode_html_entities(&candidate);

    let absolute = source
        .join(candidate.trim())
        .map_err(|_| AppError::invalid_image_url(Rejection::InvalidFormat))?;

    let image_url = guard.check(absolute.as_str()).map_err(|reason| {
        tracing::warn!(source = %source, image = %absolute, %reason, "Rejected extracted image URL");
        AppError::invalid_image_url(reason)
    })?;

    let title = raw
        .title
        .map(|t| decode_html_entities(&t).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let description = raw
        .description
        .map(|d| decode_html_entities(&d).trim().to_string())
        .unwrap_or_default();

    Ok(OgMetadata {
        image_url: image_url.to_string(),
        title,
        description,
        source_url: source.to_string(),
    })
}

// ── Unit tests ─────────────────────────────────────────────────────────────
