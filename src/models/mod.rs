use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ============================================================================
// Resolver Models
// ============================================================================

/// Preview metadata returned by `GET /resolve`.
///
/// `image_url` is always absolute and has passed the URL guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OgMetadata {
    pub image_url: String,
    pub title: String,
    pub description: String,
    pub source_url: String,
}

// ============================================================================
// Download Models
// ============================================================================

/// A fetched image ready to be relayed to the caller.
#[derive(Debug, Clone)]
pub struct ImageDownload {
    pub body: Bytes,
    /// Normalised media type, e.g. `image/png`.
    pub content_type: String,
    /// Sanitised base name plus the extension derived from `content_type`.
    pub filename: String,
}
