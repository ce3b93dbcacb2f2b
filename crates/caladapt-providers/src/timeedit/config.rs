//! TimeEdit provider configuration.

use std::time::Duration;

use url::Url;

/// Configuration for the TimeEdit provider.
#[derive(Debug, Clone)]
pub struct TimeEditConfig {
    /// Public schedule directory; feeds live at `<base><id>.ics`.
    pub base_url: Url,

    /// Deadline for fetching one feed.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl TimeEditConfig {
    /// Default public schedule directory.
    pub const DEFAULT_BASE_URL: &'static str = "https://cloud.timeedit.net/chalmers/web/public/";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Creates a configuration for the given schedule directory.
    ///
    /// A missing trailing slash is added so ids resolve inside the
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let mut parsed = Url::parse(base_url.as_ref())?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            base_url: parsed,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("caladapt/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Creates a configuration for [`DEFAULT_BASE_URL`](Self::DEFAULT_BASE_URL).
    pub fn with_default_base() -> Result<Self, url::ParseError> {
        Self::new(Self::DEFAULT_BASE_URL)
    }

    /// Sets the fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
