// Snapshot retrieval: SnapshotFetcher sits between the router and the network

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("lobx-agg/", env!("CARGO_PKG_VERSION"));
// Error pages can be whole HTML documents
const MAX_ERROR_BODY_CHARS: usize = 200;

#[async_trait::async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// GET `url` and return the body.
    ///
    /// A non-success status is an error; a successful but empty body is not
    /// (the parser decides what an empty body means).
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SnapshotFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(body) });
        }

        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Snapshot fetched");
        Ok(body)
    }
}

fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body,
    }
}
