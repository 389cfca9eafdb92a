//! Description templating and plain-text extraction.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use catalog_indexer_shared::StoreId;

use crate::catalog::ContentFilter;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*(\w+)\s+(\w+)\s*=\s*["']?([^"'}\s]*)["']?\s*\}\}"#).unwrap()
});
static ANY_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^}]*\}\}").unwrap());
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Expands `{{media url=..}}` and `{{store url=..}}` directives against a base URL.
///
/// Directives it does not know are removed.
#[derive(Debug, Clone)]
pub struct DirectiveFilter {
    base_url: String,
}

impl DirectiveFilter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn expand(&self, caps: &Captures<'_>) -> Option<String> {
        let path = caps[3].trim_start_matches('/');
        match (&caps[1], &caps[2]) {
            ("media", "url") => Some(format!("{}media/{}", self.base_url, path)),
            ("store", "url") | ("store", "direct_url") => {
                Some(format!("{}{}", self.base_url, path))
            }
            _ => None,
        }
    }
}

impl ContentFilter for DirectiveFilter {
    fn filter(&self, content: &str, _store_id: StoreId) -> String {
        let expanded = DIRECTIVE.replace_all(content, |caps: &Captures<'_>| {
            self.expand(caps).unwrap_or_default()
        });
        ANY_DIRECTIVE.replace_all(&expanded, "").into_owned()
    }
}

/// Plain text of an HTML fragment: script and style elements go first, then every tag.
pub fn strip_markup(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, "");
    TAG.replace_all(&without_code, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_drops_scripts() {
        assert_eq!(strip_markup("<script>x()</script>Hello"), "Hello");
        assert_eq!(
            strip_markup("<style type=\"text/css\">p{}</style><p>Soft <b>cotton</b></p>\n"),
            "Soft cotton"
        );
        assert_eq!(strip_markup("<SCRIPT>\nalert(1)\n</SCRIPT>ok"), "ok");
    }

    #[test]
    fn test_directives_are_expanded() {
        let filter = DirectiveFilter::new("https://shop.test/");
        assert_eq!(
            filter.filter(r#"<img src="{{media url="wysiwyg/a.png"}}"/>"#, 1),
            r#"<img src="https://shop.test/media/wysiwyg/a.png"/>"#
        );
        assert_eq!(
            filter.filter("<a href=\"{{store url='sale'}}\">Sale</a>", 1),
            "<a href=\"https://shop.test/sale\">Sale</a>"
        );
        assert_eq!(filter.filter("a{{widget type=\"x\" id=\"1\"}}b", 1), "ab");
    }
}
