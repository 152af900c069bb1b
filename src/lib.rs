//! # Newsstand
//!
//! A news ingestion pipeline: per-source feed clients, rule-based HTML
//! extraction, and a merging item store.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator → Registry → Client → (network) → Extraction → Item → Store (merge)
//! ```
//!
//! - [`client`]: per-source fetch/normalize/hydrate strategies
//! - [`extract`]: marker-bounded HTML fragment extraction
//! - [`fetcher`]: HTTP transport with a retryable error taxonomy
//! - [`store`]: SQLite persistence with merge-insert semantics
//! - [`orchestrator`]: refresh and hydrate-on-demand workflows
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use newsstand::app::AppContext;
//! use newsstand::cancel::CancelToken;
//! use newsstand::config::IngestConfig;
//!
//! let ctx = AppContext::new(None, &IngestConfig::default())?;
//! let summary = ctx.orchestrator.refresh_all(&CancelToken::new()).await?;
//! println!("{} items merged", summary.items_merged);
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires store, registry and orchestrator
/// together once at process start.
pub mod app;

/// Cooperative cancellation token shared between callers and in-flight
/// work.
pub mod cancel;

/// Per-source news clients.
///
/// - [`NewsClient`](client::NewsClient): the fetch-feed / hydrate
///   capability pair
/// - [`RuleClient`](client::RuleClient): data-driven implementation
/// - [`ClientRegistry`](client::ClientRegistry): source name resolution
pub mod client;

/// TOML configuration: backoff tuning, worker pool size and user-defined
/// sources merged over the built-in table.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): one article with a SHA-256 identity key
/// - [`Image`](domain::Image): article image with optional caption
/// - [`Source`](domain::Source): static per-source descriptor
pub mod domain;

/// Marker-bounded HTML fragment extraction and image URL normalization.
pub mod extract;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async transport seam
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`BackoffPolicy`](fetcher::BackoffPolicy): pure exponential backoff
pub mod fetcher;

/// Refresh and hydrate-on-demand workflows over clients and store.
pub mod orchestrator;

/// SQLite persistence layer.
///
/// - [`ItemStore`](store::ItemStore): merge/query/mutate contract
/// - [`SqliteStore`](store::SqliteStore): rusqlite implementation with
///   change notifications
pub mod store;
