pub mod backoff;
pub mod http_fetcher;

use async_trait::async_trait;
use thiserror::Error;

pub use backoff::{BackoffPolicy, Decision};
pub use http_fetcher::HttpFetcher;

/// Classification of a failed fetch, used by the backoff policy to decide
/// whether a retry can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    ConnectionReset,
    /// HTTP 5xx
    ServerUnavailable,
    /// HTTP 404
    NotFound,
    MalformedResponse,
    Cancelled,
}

impl FetchErrorKind {
    /// Transient failures are worth retrying; everything else is permanent
    /// for this cycle.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FetchErrorKind::Timeout
                | FetchErrorKind::ConnectionReset
                | FetchErrorKind::ServerUnavailable
        )
    }
}

#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {url}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// Network transport seam. The single implementation talks HTTP via
/// reqwest; tests substitute scripted responders so no fixture ever
/// touches the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<String, FetchError>;
}
