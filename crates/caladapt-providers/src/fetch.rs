//! Outbound HTTP fetching of calendar feeds.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

/// The parts of an HTTP response the adapter validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    /// Creates a `200` response with the given content type.
    pub fn ok(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the content type is `text/calendar`, ignoring case
    /// and parameters.
    pub fn is_calendar(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/calendar"))
        })
    }
}

/// Performs a single GET.
///
/// The returned future is `'static` so it can outlive the caller: the
/// adapter spawns it and may stop waiting before it finishes.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> BoxFuture<'static, ProviderResult<FetchResponse>>;
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Connect timeout; the overall deadline is enforced by the adapter.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a fetcher sending the given user agent.
    pub fn new(user_agent: &str) -> ProviderResult<Self> {
        let client = Client::builder()
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("Failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> BoxFuture<'static, ProviderResult<FetchResponse>> {
        let client = self.client.clone();
        let url = url.clone();
        Box::pin(async move {
            trace!(url = %url, "Sending request");
            let response = client.get(url.clone()).send().await.map_err(|e| {
                ProviderError::network(format!("Request to {} failed: {}", url, e)).with_source(e)
            })?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.map_err(|e| {
                ProviderError::network(format!("Failed to read response from {}: {}", url, e))
                    .with_source(e)
            })?;

            debug!(
                url = %url,
                status,
                content_type = ?content_type,
                bytes = body.len(),
                "Received response"
            );
            Ok(FetchResponse {
                status,
                content_type,
                body,
            })
        })
    }
}
