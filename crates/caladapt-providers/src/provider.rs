//! CalendarProvider trait definition.
//!
//! A provider knows how a calendar source addresses its feeds and how its
//! exports should be rewritten. Fetching is done by the
//! [`Adapter`](crate::adapter::Adapter), which is generic over the provider.

use std::future::Future;
use std::pin::Pin;

use caladapt_core::Calendar;
use url::Url;

use crate::error::ProviderResult;

/// A boxed future, used where a future has to be spawned or stored.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A named link offered next to an adapted calendar (e.g. the web view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderExtra {
    pub name: String,
    pub url: Url,
}

impl ProviderExtra {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }
}

/// A calendar source.
///
/// # Example Implementation
///
/// ```ignore
/// struct StaticProvider {
///     base: Url,
/// }
///
/// impl CalendarProvider for StaticProvider {
///     fn name(&self) -> &str { "static" }
///
///     fn create_url(&self, id: &str) -> ProviderResult<Url> {
///         self.base.join(&format!("{id}.ics")).map_err(|e| {
///             ProviderError::invalid_input(e.to_string())
///         })
///     }
///     // ... other methods
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the provider name, used in logs and errors.
    fn name(&self) -> &str;

    /// Builds the feed URL for a provider-specific calendar id.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error for ids the provider cannot address.
    fn create_url(&self, id: &str) -> ProviderResult<Url>;

    /// Recovers the calendar id from a feed or web URL.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error for URLs outside this provider.
    fn get_id(&self, url: &str) -> ProviderResult<String>;

    /// Rewrites a freshly parsed calendar into its presentable form.
    fn convert_calendar(&self, calendar: Calendar) -> ProviderResult<Calendar>;

    /// Returns extra links for a feed URL. Defaults to none.
    fn get_extras(&self, _url: &Url) -> Vec<ProviderExtra> {
        Vec::new()
    }
}
