//! Built-in source table.
//!
//! Each entry is a pure data descriptor: feed endpoints, the base host for
//! image URL resolution, marker pairs for its article layout, and (for
//! keyword-tagged feeds) the category keyword table. User configuration
//! can extend or override this table, see [`crate::config`].

use std::collections::HashMap;

use crate::domain::{FeedEndpoint, Source};
use crate::extract::{BodyRule, ExtractRule, ImageRule, MarkerPair};

const HEADLINE_FEED: &str = "http://hd.stheadline.com/rss/news/daily/";

/// Headline publishes one combined daily feed per category query, tagging
/// every title with a bracketed category keyword.
fn headline() -> Source {
    let categories: [(&str, &str); 8] = [
        ("hongkong", " (港聞) "),
        ("international", " (國際) "),
        ("china", " (中國) "),
        ("finance", " (財經) "),
        ("property", " (地產) "),
        ("entertainment", " (娛樂) "),
        ("supplement", " (副刊) "),
        ("sports", " (體育) "),
    ];

    let feeds = categories
        .iter()
        .map(|(category, _)| {
            FeedEndpoint::new(format!("{HEADLINE_FEED}?category={category}"), Some(category))
        })
        .collect();

    let keywords: HashMap<String, String> = categories
        .iter()
        .map(|(category, keyword)| (category.to_string(), keyword.to_string()))
        .collect();

    Source {
        name: "Headline".into(),
        base_host: "http://static.stheadline.com".into(),
        feeds,
        rule: ExtractRule {
            body: BodyRule {
                container: None,
                fragment: MarkerPair::new(
                    "<div id=\"news-content\" class=\"set-font-aera\" style=\"visibility: visible;\">",
                    "</div>",
                ),
                separator: String::new(),
            },
            images: ImageRule {
                container: MarkerPair::new("<a class=\"fancybox\" rel=\"gallery\"", "</a>"),
                url_attr: "href".into(),
                caption_attr: "title".into(),
                // Gallery titles carry a leading bullet glyph.
                caption_prefix: "■".into(),
            },
        },
        keywords,
    }
}

fn hket() -> Source {
    let feeds = ["hongkong", "china", "international", "finance"]
        .iter()
        .map(|category| {
            FeedEndpoint::new(format!("https://www.hket.com/rss/{category}"), Some(category))
        })
        .collect();

    Source {
        name: "HKET".into(),
        base_host: "https://www.hket.com".into(),
        feeds,
        rule: ExtractRule {
            body: BodyRule {
                container: Some(MarkerPair::new(
                    "<div class=\"article-detail\">",
                    "<div class=\"article-detail_facebook-like\">",
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
        },
        keywords: HashMap::new(),
    }
}

pub fn builtin_sources() -> Vec<Source> {
    vec![headline(), hket()]
}
