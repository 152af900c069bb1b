use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::extract::ExtractRule;

/// One feed URL of a source, tied to the category it serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEndpoint {
    pub url: String,
    pub category: Option<String>,
}

impl FeedEndpoint {
    pub fn new(url: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            url: url.into(),
            category: category.map(str::to_string),
        }
    }
}

/// Static descriptor of a news source. Immutable configuration, not user
/// data: a name, one feed endpoint per category, the base host used to
/// resolve root-relative image URLs, and the extraction rule for its
/// article pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub base_host: String,
    pub feeds: Vec<FeedEndpoint>,
    #[serde(default)]
    pub rule: ExtractRule,
    /// Category label -> bracketed title keyword, for sources that publish
    /// every category into one feed and tag entries in the title instead.
    #[serde(default)]
    pub keywords: HashMap<String, String>,
}

impl Source {
    /// The keyword a feed entry's title must carry to belong to `endpoint`,
    /// if this source uses keyword-tagged titles at all.
    pub fn keyword_for(&self, endpoint: &FeedEndpoint) -> Option<&str> {
        let category = endpoint.category.as_deref()?;
        self.keywords.get(category).map(String::as_str)
    }
}
