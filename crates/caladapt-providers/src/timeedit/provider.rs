//! TimeEdit provider implementation.

use std::sync::LazyLock;

use caladapt_core::{Calendar, format_event};
use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::config::TimeEditConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{CalendarProvider, ProviderExtra};

/// Schedule ids are URL-safe tokens such as `ri6Y7XYQ5Q5Z6Q`.
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid id regex"));

const FEED_SUFFIX: &str = ".ics";
const VIEW_SUFFIX: &str = ".html";

/// Provider for TimeEdit public schedules.
#[derive(Debug, Clone)]
pub struct TimeEditProvider {
    config: TimeEditConfig,
}

impl TimeEditProvider {
    /// Provider name used in logs and errors.
    pub const NAME: &'static str = "timeedit";

    pub fn new(config: TimeEditConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TimeEditConfig {
        &self.config
    }

    fn validate_id(&self, id: &str) -> ProviderResult<()> {
        if ID_REGEX.is_match(id) {
            Ok(())
        } else {
            Err(self.invalid_input(format!("{id:?} is not a TimeEdit schedule id")))
        }
    }

    fn resolve(&self, file: &str) -> ProviderResult<Url> {
        self.config.base_url.join(file).map_err(|e| {
            self.invalid_input(format!("cannot build URL for {file:?}: {e}"))
                .with_source(e)
        })
    }

    fn invalid_input(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::invalid_input(message).with_provider(Self::NAME)
    }
}

impl CalendarProvider for TimeEditProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_url(&self, id: &str) -> ProviderResult<Url> {
        self.validate_id(id)?;
        self.resolve(&format!("{id}{FEED_SUFFIX}"))
    }

    fn get_id(&self, url: &str) -> ProviderResult<String> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| self.invalid_input(format!("{url:?} is not a URL: {e}")))?;
        let base = &self.config.base_url;

        if parsed.origin() != base.origin() {
            return Err(self.invalid_input(format!("{url:?} is not a TimeEdit URL")));
        }
        let file = parsed
            .path()
            .strip_prefix(base.path())
            .ok_or_else(|| self.invalid_input(format!("{url:?} is outside {base}")))?;
        let id = file
            .strip_suffix(FEED_SUFFIX)
            .or_else(|| file.strip_suffix(VIEW_SUFFIX))
            .ok_or_else(|| {
                self.invalid_input(format!("{url:?} is neither a feed nor a schedule view"))
            })?;

        self.validate_id(id)?;
        trace!(url, id, "Resolved TimeEdit id");
        Ok(id.to_string())
    }

    fn convert_calendar(&self, mut calendar: Calendar) -> ProviderResult<Calendar> {
        for event in &mut calendar.events {
            format_event(event);
        }
        debug!(
            provider = Self::NAME,
            events = calendar.events.len(),
            "Converted calendar"
        );
        Ok(calendar)
    }

    fn get_extras(&self, url: &Url) -> Vec<ProviderExtra> {
        self.get_id(url.as_str())
            .and_then(|id| self.resolve(&format!("{id}{VIEW_SUFFIX}")))
            .map(|view| vec![ProviderExtra::new("Schedule", view)])
            .unwrap_or_default()
    }
}
