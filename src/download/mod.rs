//! Image Download Relay: re-validates an image URL, fetches it under the image
//! size limit and prepares it to be served back as an attachment.

use crate::error::{AppError, AppResult};
use crate::fetch::Fetcher;
use crate::guard::UrlGuard;
use crate::models::ImageDownload;

pub const IMAGE_ACCEPT: &str = "image/*";
pub const DEFAULT_FILENAME: &str = "og-image";

/// Filenames are capped at this many characters, before the extension.
const MAX_FILENAME_CHARS: usize = 100;

/// Media types relayed as images. Anything else is refused.
const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/apng",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/avif",
    "image/bmp",
    "image/tiff",
    "image/x-icon",
    "image/vnd.microsoft.icon",
];

/// Fetch `image_url` and package it for download as `filename`.
///
/// The URL is validated here even if it came out of an earlier `/resolve`
/// call: nothing is trusted across a request boundary.
pub async fn download(
    guard: &UrlGuard,
    fetcher: &Fetcher,
    image_url: &str,
    filename: &str,
) -> AppResult<ImageDownload> {
    let url = guard.check(image_url).map_err(|reason| {
        tracing::debug!(url = %image_url, %reason, "Rejected download URL");
        AppError::invalid_url(reason)
    })?;

    let fetched = fetcher
        .fetch(&url, IMAGE_ACCEPT, fetcher.limits().max_image_bytes)
        .await?;

    let content_type = image_content_type(fetched.content_type.as_deref(), &fetched.body)
        .ok_or_else(|| {
            tracing::warn!(
                url = %url,
                content_type = ?fetched.content_type,
                "Download target is not an image"
            );
            AppError::NotAnImage
        })?;

    let filename = format!(
        "{}.{}",
        sanitize_filename(filename),
        extension_for(&content_type)
    );

    Ok(ImageDownload {
        body: fetched.body,
        content_type,
        filename,
    })
}

/// Make a caller-supplied name safe to embed in `Content-Disposition`.
///
/// Every character outside `[A-Za-z0-9._-]` becomes `-`, runs of `-` collapse
/// to one, leading/trailing `-` are trimmed and the result is capped at 100
/// characters. An empty result becomes `og-image`. Applying it twice gives the
/// same output as applying it once.
pub fn sanitize_filename(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let truncated: String = collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    let sanitized = truncated.trim_end_matches('-');

    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized.to_string()
    }
}

/// `image/jpeg; charset=binary` → `image/jpeg`.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_image_type(content_type: &str) -> bool {
    IMAGE_TYPES.contains(&media_type(content_type).as_str())
}

/// Decide the media type to serve, or `None` if the body is not an image.
///
/// A missing or generic declared type falls back to magic-byte detection.
fn image_content_type(declared: Option<&str>, body: &[u8]) -> Option<String> {
    match declared.map(media_type).as_deref() {
        Some(media) if is_image_type(media) => Some(media.to_string()),
        None | Some("") | Some("application/octet-stream") => infer::get(body)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type().to_string()),
        Some(_) => None,
    }
}

pub fn extension_for(content_type: &str) -> &'static str {
    let media = media_type(content_type);
    if media.contains("jpeg") || media.contains("jpg") {
        "jpg"
    } else if media.contains("webp") {
        "webp"
    } else if media.contains("gif") {
        "gif"
    } else if media.contains("svg") {
        "svg"
    } else {
        "png"
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn is_safe(name: &str) -> bool {
        name.len() <= MAX_FILENAME_CHARS
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("hello world.png"), "hello-world.png");
        assert_eq!(sanitize_filename("a\"; b=c"), "a-b-c");
        assert_eq!(sanitize_filename("x\r\nSet-Cookie: y"), "x-Set-Cookie-y");
        assert_eq!(sanitize_filename("../../etc/passwd"), "..-..-etc-passwd");
    }

    #[test]
    fn sanitize_collapses_and_trims_dashes() {
        assert_eq!(sanitize_filename("--a---b--"), "a-b");
        assert_eq!(sanitize_filename("  spaced  out  "), "spaced-out");
    }

    #[test]
    fn sanitize_defaults_when_nothing_survives() {
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("   "), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("文字"), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("----"), DEFAULT_FILENAME);
    }

    #[test]
    fn sanitize_caps_length() {
        assert_eq!(sanitize_filename(&"a".repeat(250)).len(), MAX_FILENAME_CHARS);
        // Cut lands on a dash: it must not survive as a trailing dash.
        let name = format!("{}-{}", "a".repeat(99), "b".repeat(10));
        assert_eq!(sanitize_filename(&name), "a".repeat(99));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let long_mixed = format!("{} {}", "x".repeat(99), "y".repeat(20));
        for input in [
            "",
            "og image (1).png",
            "\"quoted\"\r\n",
            "-lead-and-trail-",
            "ünïcödé näme",
            long_mixed.as_str(),
            "a.b_c-d",
        ] {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input {input:?}");
            assert!(is_safe(&once), "{once:?} has unsafe characters");
        }
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/jpg"), "jpg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/gif"), "gif");
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/avif"), "png");
    }

    #[test]
    fn recognises_image_types_with_parameters() {
        assert!(is_image_type("image/PNG"));
        assert!(is_image_type("image/jpeg; charset=binary"));
        assert!(!is_image_type("text/html; charset=utf-8"));
        assert!(!is_image_type("application/octet-stream"));
    }

    #[test]
    fn declared_image_type_is_normalised() {
        assert_eq!(
            image_content_type(Some("Image/JPEG; q=1"), b"").as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn untyped_body_is_sniffed() {
        assert_eq!(
            image_content_type(None, PNG_MAGIC).as_deref(),
            Some("image/png")
        );
        assert_eq!(
            image_content_type(Some("application/octet-stream"), PNG_MAGIC).as_deref(),
            Some("image/png")
        );
        assert_eq!(image_content_type(None, b"<html></html>"), None);
    }

    #[test]
    fn declared_non_image_is_refused_even_with_image_bytes() {
        assert_eq!(image_content_type(Some("text/html"), PNG_MAGIC), None);
    }
}
