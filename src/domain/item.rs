use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An image attached to an article. Owned by exactly one [`Item`];
/// the URL is stored absolute (see `extract::resolve_image_url`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub caption: Option<String>,
}

impl Image {
    pub fn new(url: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            url: url.into(),
            caption,
        }
    }
}

/// The canonical unit of content.
///
/// An item starts partially hydrated (feed-level title/summary only) and is
/// filled in by the hydration step. The key never changes once created: two
/// items with the same key denote the same logical article and are
/// reconciled by the store, never duplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: Option<String>,
    /// Feed-level summary until hydration replaces it with the full text.
    pub body: Option<String>,
    pub images: Vec<Image>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub fully_hydrated: bool,
    pub bookmarked: bool,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(source: &str, link: impl Into<String>) -> Self {
        let link = link.into();
        Self {
            key: Self::generate_key(source, &link),
            title: String::new(),
            link,
            source: source.to_string(),
            category: None,
            body: None,
            images: Vec::new(),
            published_at: None,
            fetched_at: Utc::now(),
            fully_hydrated: false,
            bookmarked: false,
            last_accessed: None,
        }
    }

    /// Generate a deterministic identity key from source name and link URL
    pub fn generate_key(source: &str, link: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(link.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Get the best available content for display
    pub fn display_body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}
