use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::fetcher::{FetchError, FetchErrorKind, Fetcher};

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("newsstand/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    fn classify_status(status: StatusCode) -> FetchErrorKind {
        if status == StatusCode::NOT_FOUND {
            FetchErrorKind::NotFound
        } else if status.is_server_error() {
            FetchErrorKind::ServerUnavailable
        } else {
            FetchErrorKind::MalformedResponse
        }
    }

    fn classify_error(error: &reqwest::Error) -> FetchErrorKind {
        if error.is_timeout() {
            FetchErrorKind::Timeout
        } else if error.is_connect() {
            FetchErrorKind::ConnectionReset
        } else {
            FetchErrorKind::MalformedResponse
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(Self::classify_error(&e), url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(Self::classify_status(status), url));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::new(Self::classify_error(&e), url))
    }
}
