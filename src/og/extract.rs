//! Best-effort meta tag search over an already size-bounded HTML string.
//!
//! This is pattern matching, not parsing: each key is looked up with the key
//! attribute before `content`, then with `content` first.

use once_cell::sync::Lazy;
use regex::Regex;

struct MetaPattern {
    key_first: Regex,
    content_first: Regex,
}

impl MetaPattern {
    fn new(key: &str) -> Self {
        let key = regex::escape(key);
        let key_attr = format!(r#"(?:^|\s)(?:property|name)\s*=\s*["']{key}["']"#);
        let content_attr = r#"(?:^|\s)content\s*=\s*(?:"([^"]*)"|'([^']*)')"#;

        MetaPattern {
            key_first: Regex::new(&format!(r"(?is)<meta\b[^>]*?{key_attr}[^>]*?{content_attr}"))
                .expect("meta regex is valid"),
            content_first: Regex::new(&format!(r"(?is)<meta\b[^>]*?{content_attr}[^>]*?{key_attr}"))
                .expect("meta regex is valid"),
        }
    }

    /// First non-blank `content` value, trying the key-first ordering before
    /// the content-first one.
    fn find(&self, html: &str) -> Option<String> {
        self.key_first
            .captures_iter(html)
            .chain(self.content_first.captures_iter(html))
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim())
            .find(|value| !value.is_empty())
            .map(str::to_owned)
    }
}

static OG_IMAGE: Lazy<MetaPattern> = Lazy::new(|| MetaPattern::new("og:image"));
static TWITTER_IMAGE: Lazy<MetaPattern> = Lazy::new(|| MetaPattern::new("twitter:image"));
static OG_TITLE: Lazy<MetaPattern> = Lazy::new(|| MetaPattern::new("og:title"));
static OG_DESCRIPTION: Lazy<MetaPattern> = Lazy::new(|| MetaPattern::new("og:description"));

static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>([^<]+)</title>").expect("title regex is valid"));

/// Meta values exactly as they appear in the page: still entity-escaped and
/// possibly relative.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawMetadata {
    pub image: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

pub fn extract_raw(html: &str) -> RawMetadata {
    RawMetadata {
        image: OG_IMAGE.find(html).or_else(|| TWITTER_IMAGE.find(html)),
        title: OG_TITLE.find(html).or_else(|| title_tag(html)),
        description: OG_DESCRIPTION.find(html),
    }
}

fn title_tag(html: &str) -> Option<String> {
    TITLE_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Unit tests ─────────────────────────────────────────────────────────────
