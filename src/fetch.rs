use crate::error::PamphletError;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// A fetched resource. `last_modified` carries the raw `Last-Modified`
/// header when the transport surfaced one.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub body: String,
    pub last_modified: Option<String>,
}

/// Transport seam for everything the runtime loads: directory listings,
/// content files and layout templates.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, PamphletError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, PamphletError> {
        debug!("GET {url}");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PamphletError::Network {
                url: url.to_string(),
                reason: response.status().to_string(),
            });
        }

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(FetchResponse {
            body: response.text().await?,
            last_modified,
        })
    }
}

/// In-memory transport serving a fixed set of URLs. Useful for embedding a
/// site snapshot and for exercising the runtime without a network.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchResponse>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.insert(
            url.into(),
            FetchResponse {
                body: body.into(),
                last_modified: None,
            },
        );
    }

    pub fn insert_with_modified(
        &mut self,
        url: impl Into<String>,
        body: impl Into<String>,
        last_modified: impl Into<String>,
    ) {
        self.pages.insert(
            url.into(),
            FetchResponse {
                body: body.into(),
                last_modified: Some(last_modified.into()),
            },
        );
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, PamphletError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| PamphletError::Network {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            })
    }
}
