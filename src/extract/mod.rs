//! Marker-bounded HTML fragment extraction.
//!
//! Article pages are scanned with per-source marker pairs instead of a DOM
//! parse: remote layouts are unreliable enough that a missing marker must
//! degrade to empty output, never to an error. An item whose page yields
//! nothing keeps its feed-derived summary as the fallback body.

use serde::{Deserialize, Serialize};

use crate::domain::Image;

/// A start/end marker pair bounding a region of raw HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Where the article body lives: an optional outer container, a repeatable
/// fragment pair inside it, and the separator joining fragments in
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRule {
    #[serde(default)]
    pub container: Option<MarkerPair>,
    #[serde(default)]
    pub fragment: MarkerPair,
    #[serde(default)]
    pub separator: String,
}

/// Where images live: a repeatable container pair plus the attribute names
/// carrying the URL and caption inside each container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRule {
    #[serde(default)]
    pub container: MarkerPair,
    #[serde(default)]
    pub url_attr: String,
    #[serde(default)]
    pub caption_attr: String,
    /// Leading ornament stripped from every caption, for layouts that
    /// prefix captions with a bullet glyph.
    #[serde(default)]
    pub caption_prefix: String,
}

/// Declarative per-source extraction descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRule {
    #[serde(default)]
    pub body: BodyRule,
    #[serde(default)]
    pub images: ImageRule,
}

/// The substring strictly between the first `start` marker and the next
/// `end` marker after it. `None` when either marker is missing.
pub fn substring_between<'a>(s: &'a str, start: &str, end: &str) -> Option<&'a str> {
    if start.is_empty() || end.is_empty() {
        return None;
    }
    let from = s.find(start)? + start.len();
    let to = s[from..].find(end)?;
    Some(&s[from..from + to])
}

/// Every non-overlapping occurrence of a `start`..`end` bounded substring,
/// in document order.
pub fn substrings_between<'a>(s: &'a str, start: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    if start.is_empty() || end.is_empty() {
        return found;
    }

    let mut rest = s;
    while let Some(from) = rest.find(start) {
        let after = &rest[from + start.len()..];
        match after.find(end) {
            Some(to) => {
                found.push(&after[..to]);
                rest = &after[to + end.len()..];
            }
            None => break,
        }
    }
    found
}

fn body_scope<'a>(html: &'a str, rule: &ExtractRule) -> &'a str {
    match &rule.body.container {
        Some(pair) => substring_between(html, &pair.start, &pair.end).unwrap_or(""),
        None => html,
    }
}

/// Extract the article body. Fragments are concatenated in document order
/// with the rule's separator; missing markers yield an empty string.
pub fn extract_body(html: &str, rule: &ExtractRule) -> String {
    let scope = body_scope(html, rule);
    substrings_between(scope, &rule.body.fragment.start, &rule.body.fragment.end)
        .join(&rule.body.separator)
}

/// Extract images from the article page. Zero containers is a normal
/// outcome, not an error.
pub fn extract_images(html: &str, rule: &ExtractRule, base_host: &str) -> Vec<Image> {
    let scope = body_scope(html, rule);
    let mut images = Vec::new();

    for container in substrings_between(scope, &rule.images.container.start, &rule.images.container.end) {
        let Some(url) = attribute_value(container, &rule.images.url_attr) else {
            continue;
        };

        let caption = attribute_value(container, &rule.images.caption_attr)
            .map(|c| c.strip_prefix(&rule.images.caption_prefix).unwrap_or(c))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        images.push(Image::new(resolve_image_url(url, base_host), caption));
    }

    images
}

fn attribute_value<'a>(container: &'a str, attr: &str) -> Option<&'a str> {
    if attr.is_empty() {
        return None;
    }
    let marker = format!("{attr}=\"");
    substring_between(container, &marker, "\"")
}

/// Normalize an image URL against the source's base host:
/// protocol-relative URLs get an `http:` prefix, absolute URLs pass
/// through, anything else is resolved against the base host.
pub fn resolve_image_url(url: &str, base_host: &str) -> String {
    if url.starts_with("//") {
        format!("http:{url}")
    } else if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{base_host}{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_rule() -> ExtractRule {
        ExtractRule {
            body: BodyRule {
                container: Some(MarkerPair::new(
                    "<div class=\"article-detail\">",
                    "<div class=\"article-footer\">",
                )),
                fragment: MarkerPair::new("<p>", "</p>"),
                separator: "<br>".into(),
            },
            images: ImageRule {
                container: MarkerPair::new("<img ", "/>"),
                url_attr: "data-src".into(),
                caption_attr: "alt".into(),
                caption_prefix: String::new(),
            },
        }
    }

    const PAGE: &str = r#"
        <html><body>
        <div class="article-detail">
            <img data-src="//static.example.com/1.jpg" alt="first" />
            <p>First paragraph.</p>
            <img data-src="/photos/2.jpg" alt="" />
            <p>Second paragraph.</p>
        <div class="article-footer">
            <p>Unrelated footer text.</p>
        </body></html>
    "#;

    #[test]
    fn test_substring_between() {
        assert_eq!(substring_between("a[x]b", "[", "]"), Some("x"));
        assert_eq!(substring_between("a[x]b", "(", ")"), None);
        assert_eq!(substring_between("a[xb", "[", "]"), None);
        assert_eq!(substring_between("abc", "", "]"), None);
    }

    #[test]
    fn test_substrings_between() {
        assert_eq!(substrings_between("[a][b][c", "[", "]"), vec!["a", "b"]);
        assert!(substrings_between("nothing here", "[", "]").is_empty());
    }

    #[test]
    fn test_extract_body_joins_fragments_in_order() {
        let body = extract_body(PAGE, &article_rule());
        assert_eq!(body, "First paragraph.<br>Second paragraph.");
    }

    #[test]
    fn test_extract_body_ignores_text_outside_container() {
        let body = extract_body(PAGE, &article_rule());
        assert!(!body.contains("footer"));
    }

    #[test]
    fn test_extract_body_missing_container_is_empty() {
        let body = extract_body("<html><p>loose</p></html>", &article_rule());
        assert_eq!(body, "");
    }

    #[test]
    fn test_extract_body_without_container_scans_whole_page() {
        let rule = ExtractRule {
            body: BodyRule {
                container: None,
                fragment: MarkerPair::new("<p>", "</p>"),
                separator: "\n".into(),
            },
            ..Default::default()
        };
        let body = extract_body("<p>a</p><p>b</p>", &rule);
        assert_eq!(body, "a\nb");
    }

    #[test]
    fn test_extract_images_normalizes_urls_and_captions() {
        let images = extract_images(PAGE, &article_rule(), "http://static.example.com");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "http://static.example.com/1.jpg");
        assert_eq!(images[0].caption.as_deref(), Some("first"));
        assert_eq!(images[1].url, "http://static.example.com/photos/2.jpg");
        // Empty alt text is no caption
        assert_eq!(images[1].caption, None);
    }

    #[test]
    fn test_extract_images_strips_caption_prefix() {
        let rule = ExtractRule {
            images: ImageRule {
                container: MarkerPair::new("<a class=\"fancybox\" rel=\"gallery\"", "</a>"),
                url_attr: "href".into(),
                caption_attr: "title".into(),
                caption_prefix: "■".into(),
            },
            ..Default::default()
        };
        let page = r#"
            <a class="fancybox" rel="gallery" href="//cdn.example.com/1.jpg" title="■市民排隊輪候"><img src="t.jpg"></a>
            <a class="fancybox" rel="gallery" href="//cdn.example.com/2.jpg" title="no bullet here"><img src="t.jpg"></a>
        "#;

        let images = extract_images(page, &rule, "http://static.example.com");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].caption.as_deref(), Some("市民排隊輪候"));
        // Captions without the ornament pass through untouched.
        assert_eq!(images[1].caption.as_deref(), Some("no bullet here"));
    }

    #[test]
    fn test_extract_images_none_found_is_empty() {
        let page = r#"<div class="article-detail"><p>text only</p><div class="article-footer">"#;
        assert!(extract_images(page, &article_rule(), "http://x").is_empty());
    }

    #[test]
    fn test_extract_images_skips_container_without_url() {
        let page = r#"<div class="article-detail"><img src="wrong-attr.jpg" alt="a" /><div class="article-footer">"#;
        assert!(extract_images(page, &article_rule(), "http://x").is_empty());
    }

    #[test]
    fn test_resolve_image_url() {
        assert_eq!(
            resolve_image_url("//cdn.example.com/a.jpg", "http://base"),
            "http://cdn.example.com/a.jpg"
        );
        assert_eq!(
            resolve_image_url("https://cdn.example.com/a.jpg", "http://base"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(
            resolve_image_url("/images/a.jpg", "http://base"),
            "http://base/images/a.jpg"
        );
    }
}
