//! The adapt pipeline: fetch a feed under a timeout, validate it, parse
//! it, narrow it and rewrite it.
//!
//! Steps run in a fixed order:
//!
//! 1. fetch, raced against the timeout
//! 2. validate status and content type
//! 3. parse
//! 4. property grouping (`group`/`gi`), on the raw event text
//! 5. [`CalendarProvider::convert_calendar`]
//! 6. filter slicing (`f`/`fg`), on the converted summaries

use std::time::Duration;

use caladapt_core::{Calendar, FilterSlicer, PropertyGroupSelection, Slicer};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::fetch::{FetchResponse, Fetcher, HttpFetcher};
use crate::provider::CalendarProvider;
use crate::timeedit::{TimeEditConfig, TimeEditProvider};

/// One group of a [`FilterSlicer`], as addressed by `f` and `fg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub slicer: FilterSlicer,
    pub group: usize,
}

impl FilterSelection {
    pub fn new(slicer: FilterSlicer, group: usize) -> Self {
        Self { slicer, group }
    }
}

/// Optional narrowing steps for [`Adapter::adapt`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptOptions {
    pub grouping: Option<PropertyGroupSelection>,
    pub filter: Option<FilterSelection>,
}

impl AdaptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grouping(mut self, grouping: PropertyGroupSelection) -> Self {
        self.grouping = Some(grouping);
        self
    }

    pub fn with_filter(mut self, filter: FilterSelection) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Fetches and rewrites calendars of one provider.
pub struct Adapter<P, F = HttpFetcher> {
    provider: P,
    fetcher: F,
    timeout: Duration,
}

impl Adapter<TimeEditProvider, HttpFetcher> {
    /// Creates a TimeEdit adapter fetching over HTTP.
    pub fn timeedit(config: TimeEditConfig) -> ProviderResult<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        let timeout = config.timeout;
        Ok(Self::new(TimeEditProvider::new(config), fetcher).with_timeout(timeout))
    }
}

impl<P, F> Adapter<P, F>
where
    P: CalendarProvider,
    F: Fetcher,
{
    /// Default fetch timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(provider: P, fetcher: F) -> Self {
        Self {
            provider,
            fetcher,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetches and parses the feed of `id`, without rewriting it.
    ///
    /// The fetch runs in its own task. If the timeout elapses first the
    /// task is left to finish on its own and its result is dropped.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an id the provider cannot address
    /// - `Timeout` when the upstream is too slow
    /// - `UpstreamStatus` / `ContentType` for a response that is not a calendar
    /// - `Parse` with the parser's message for a malformed body
    pub async fn fetch_calendar(&self, id: &str) -> ProviderResult<Calendar> {
        let name = self.provider.name();
        let url = self.provider.create_url(id)?;

        debug!(provider = name, url = %url, "Fetching calendar");
        let task = tokio::spawn(self.fetcher.fetch(&url));

        let response = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(|e| e.with_provider(name))?,
            Ok(Err(join_err)) => {
                return Err(ProviderError::internal(format!("Fetch task failed: {}", join_err))
                    .with_provider(name)
                    .with_source(join_err));
            }
            Err(_) => {
                warn!(
                    provider = name,
                    url = %url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Fetch timed out, abandoning request"
                );
                return Err(ProviderError::timeout(format!(
                    "{} did not answer within {:?}",
                    url, self.timeout
                ))
                .with_provider(name));
            }
        };

        validate(&response, url.as_str()).map_err(|e| e.with_provider(name))?;
        Calendar::parse(&response.body).map_err(|e| ProviderError::from(e).with_provider(name))
    }

    /// Fetches, narrows and rewrites the calendar of `id`.
    pub async fn adapt(&self, id: &str, options: &AdaptOptions) -> ProviderResult<Calendar> {
        let mut calendar = self.fetch_calendar(id).await?;
        let fetched = calendar.event_count();

        if let Some(ref grouping) = options.grouping {
            calendar.events = grouping.apply(std::mem::take(&mut calendar.events))?;
        }

        let mut calendar = self.provider.convert_calendar(calendar)?;

        if let Some(ref filter) = options.filter {
            calendar.events = filter
                .slicer
                .get_group(std::mem::take(&mut calendar.events), filter.group)?;
        }

        info!(
            provider = self.provider.name(),
            id,
            fetched,
            events = calendar.event_count(),
            "Adapted calendar"
        );
        Ok(calendar)
    }
}

fn validate(response: &FetchResponse, url: &str) -> ProviderResult<()> {
    if !response.is_success() {
        return Err(ProviderError::upstream_status(response.status, url));
    }
    if !response.is_calendar() {
        return Err(ProviderError::content_type(
            response.content_type.as_deref(),
            url,
        ));
    }
    Ok(())
}
