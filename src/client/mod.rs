//! Per-source news clients.
//!
//! A client covers two capabilities: turning one of its source's feeds into
//! partially-hydrated items, and filling in one item's full body and images
//! from its article page. Behavioral variation between sources is data
//! (feed URLs, keyword tables, extraction markers), so there is a single
//! [`RuleClient`] driven by a [`Source`] descriptor instead of a client
//! type per newspaper. Clients never write to the store; that separation
//! keeps them testable against canned HTML fixtures.

pub mod registry;
pub mod sources;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use html_escape::decode_html_entities;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::domain::{FeedEndpoint, Image, Item, Source};
use crate::extract;
use crate::fetcher::{BackoffPolicy, FetchError, FetchErrorKind, Fetcher};

pub use registry::ClientRegistry;

/// Result of one feed fetch. `degraded` marks a batch that is empty because
/// retries were exhausted, as opposed to a feed that genuinely had nothing
/// new; either way the fetch itself is a success to its caller.
#[derive(Debug, Default)]
pub struct FeedBatch {
    pub items: Vec<Item>,
    pub degraded: bool,
}

#[async_trait]
pub trait NewsClient: Send + Sync {
    fn source(&self) -> &Source;

    /// Download and normalize one feed. Items come back sorted by
    /// descending publish timestamp, ties in input order. Exhausted
    /// retries degrade to an empty batch, never an error: one dead source
    /// must not fail a whole refresh.
    async fn fetch_feed(&self, endpoint: &FeedEndpoint, cancel: &CancelToken) -> FeedBatch;

    /// Download the item's article page and fill in body and images. On
    /// exhausted retries the input comes back unchanged so the caller can
    /// still show the feed-level summary.
    async fn hydrate(&self, item: Item, cancel: &CancelToken) -> Item;
}

/// The one concrete client: a source descriptor plus the shared
/// retry/normalize/sort machinery.
pub struct RuleClient {
    source: Source,
    fetcher: Arc<dyn Fetcher>,
    policy: BackoffPolicy,
}

impl RuleClient {
    pub fn new(source: Source, fetcher: Arc<dyn Fetcher>, policy: BackoffPolicy) -> Self {
        Self {
            source,
            fetcher,
            policy,
        }
    }

    /// Fetch `url`, sleeping and retrying per the backoff policy for
    /// transient failures. The cancellation token is checked before every
    /// network call.
    async fn get_with_retry(
        &self,
        url: &str,
        cancel: &CancelToken,
    ) -> std::result::Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::new(FetchErrorKind::Cancelled, url));
            }

            match self.fetcher.get(url).await {
                Ok(body) => return Ok(body),
                Err(error) => {
                    attempt += 1;
                    let decision = self.policy.next_delay(attempt, error.kind);
                    if !decision.retry {
                        return Err(error);
                    }
                    debug!(
                        url,
                        attempt,
                        delay_ms = decision.delay.as_millis() as u64,
                        "Retrying after {:?}",
                        error.kind
                    );
                    tokio::time::sleep(decision.delay).await;
                }
            }
        }
    }

    /// Convert one parsed feed entry into a partially-hydrated item, or
    /// drop it when the endpoint's keyword filter does not match.
    fn normalize_entry(
        &self,
        entry: feed_rs::model::Entry,
        endpoint: &FeedEndpoint,
        keyword: Option<&str>,
    ) -> Option<Item> {
        let link = entry.links.first().map(|l| l.href.clone())?;

        let mut title = entry
            .title
            .map(|t| decode_html_entities(&t.content).replace("<br>", "\n"))
            .unwrap_or_default();

        if let Some(keyword) = keyword {
            // Keyword-tagged feeds publish every category together; a
            // title without the requested tag belongs to another category.
            // Feed parsers may trim surrounding whitespace, so match on
            // the trimmed keyword.
            let index = title.find(keyword.trim())?;
            title.truncate(index);
        }
        let title = title.trim().to_string();

        let mut item = Item::new(&self.source.name, link);
        item.title = title;
        item.category = endpoint.category.clone();
        item.published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));
        item.body = entry
            .summary
            .map(|s| decode_html_entities(&s.content).to_string())
            .filter(|s| !s.is_empty());

        // A feed enclosure seeds the image list until hydration replaces it.
        if let Some(url) = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|c| c.url.as_ref())
        {
            item.images.push(Image::new(
                extract::resolve_image_url(url.as_str(), &self.source.base_host),
                None,
            ));
        }

        Some(item)
    }
}

#[async_trait]
impl NewsClient for RuleClient {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_feed(&self, endpoint: &FeedEndpoint, cancel: &CancelToken) -> FeedBatch {
        let body = match self.get_with_retry(&endpoint.url, cancel).await {
            Ok(body) => body,
            Err(error) => {
                warn!(source = %self.source.name, url = %endpoint.url, %error, "Feed fetch failed, skipping this cycle");
                return FeedBatch {
                    items: Vec::new(),
                    degraded: true,
                };
            }
        };

        let feed = match feed_rs::parser::parse(body.as_bytes()) {
            Ok(feed) => feed,
            Err(error) => {
                warn!(source = %self.source.name, url = %endpoint.url, %error, "Feed unparseable, skipping this cycle");
                return FeedBatch {
                    items: Vec::new(),
                    degraded: true,
                };
            }
        };

        let keyword = self.source.keyword_for(endpoint);
        let mut items: Vec<Item> = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.normalize_entry(entry, endpoint, keyword))
            .collect();

        // Newest first; sort_by is stable so ties keep feed order.
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        debug!(source = %self.source.name, url = %endpoint.url, count = items.len(), "Feed fetched");
        FeedBatch {
            items,
            degraded: false,
        }
    }

    async fn hydrate(&self, mut item: Item, cancel: &CancelToken) -> Item {
        let html = match self.get_with_retry(&item.link, cancel).await {
            Ok(html) => html,
            Err(error) => {
                warn!(key = %item.key, url = %item.link, %error, "Hydration fetch failed, keeping feed summary");
                return item;
            }
        };

        let body = extract::extract_body(&html, &self.source.rule);
        if !body.is_empty() {
            item.body = Some(body);
        }

        let images = extract::extract_images(&html, &self.source.rule, &self.source.base_host);
        if !images.is_empty() {
            item.images = images;
        }

        item.fully_hydrated = true;
        item
    }
}
