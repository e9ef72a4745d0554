use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|([a-zA-Z]+));").expect("entity regex is valid")
});

/// Named entities recognised in meta values. Lookup is case-insensitive.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("hellip", "\u{2026}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
];

/// Decode named, decimal and hex character references in a single pass.
///
/// Unknown named entities are left as written. Numeric references to NUL,
/// surrogates or anything at or past U+10FFFF are dropped.
pub fn decode_html_entities(text: &str) -> String {
    ENTITY_REGEX
        .replace_all(text, |caps: &Captures| {
            if let Some(hex) = caps.get(1) {
                code_point(u32::from_str_radix(hex.as_str(), 16).ok())
            } else if let Some(dec) = caps.get(2) {
                code_point(dec.as_str().parse().ok())
            } else {
                let name = caps[3].to_ascii_lowercase();
                NAMED_ENTITIES
                    .iter()
                    .find(|(entity, _)| *entity == name)
                    .map(|(_, decoded)| decoded.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            }
        })
        .into_owned()
}

fn code_point(value: Option<u32>) -> String {
    value
        .filter(|&n| n > 0 && n < 0x10FFFF)
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '&' => "&amp;".to_string(),
                '<' => "&lt;".to_string(),
                '>' => "&gt;".to_string(),
                '"' => "&quot;".to_string(),
                '\'' => "&#39;".to_string(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn decodes_named_entities() {
        assert_eq!(decode_html_entities("a &amp; b"), "a & b");
        assert_eq!(decode_html_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_html_entities("&quot;hi&quot; &apos;x&apos;"), "\"hi\" 'x'");
        assert_eq!(decode_html_entities("Caf&eacute;"), "Caf&eacute;");
        assert_eq!(decode_html_entities("Wait&hellip;"), "Wait\u{2026}");
    }

    #[test]
    fn named_entities_ignore_case() {
        assert_eq!(decode_html_entities("&AMP; &Lt;"), "& <");
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(decode_html_entities("it&#39;s"), "it's");
        assert_eq!(decode_html_entities("a&#x2F;b&#X2f;c"), "a/b/c");
        assert_eq!(decode_html_entities("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn drops_invalid_code_points() {
        assert_eq!(decode_html_entities("a&#0;b"), "ab");
        assert_eq!(decode_html_entities("a&#xD800;b"), "ab");
        assert_eq!(decode_html_entities("a&#x110000;b"), "ab");
        assert_eq!(decode_html_entities("a&#99999999999999;b"), "ab");
    }

    #[test]
    fn decoding_is_single_pass() {
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_html_entities("&amp;#39;"), "&#39;");
    }

    #[test]
    fn leaves_bare_ampersands_alone() {
        assert_eq!(
            decode_html_entities("https://x.test/a?b=1&c=2"),
            "https://x.test/a?b=1&c=2"
        );
    }

    #[test]
    fn round_trips_escaped_ascii() {
        for text in [
            "Tom & Jerry",
            "<script>alert(\"x\")</script>",
            "it's 'quoted' & \"double\"",
            "&amp; already looks escaped",
            "a&b<c>d\"e'f",
        ] {
            assert_eq!(decode_html_entities(&encode(text)), text);
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(decode_html_entities(""), "");
    }
}
