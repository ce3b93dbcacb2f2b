//! Server and picker configuration.

use std::path::PathBuf;
use std::time::Duration;

use caladapt_core::{TracingConfig, init_tracing};
use caladapt_providers::TimeEditConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the calendars offered for merging.
    pub calendar_dir: PathBuf,

    /// Picker configuration (JSON) listing the mergeable calendars.
    pub picker_config: PathBuf,

    /// TimeEdit public schedule directory.
    pub timeedit_base_url: String,

    /// Deadline for one upstream fetch.
    pub fetch_timeout: Duration,

    /// Log output; defaults to JSON with one record per finished request.
    pub tracing: TracingConfig,
}

impl ServerConfig {
    /// Default calendar directory.
    pub const DEFAULT_CALENDAR_DIR: &'static str = "calendars";

    /// Default picker configuration file name, inside the calendar directory.
    pub const DEFAULT_PICKER_CONFIG: &'static str = "picker.json";

    /// Default fetch timeout in seconds.
    pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = TimeEditConfig::DEFAULT_TIMEOUT_SECS;

    /// Creates a configuration serving calendars from `calendar_dir`.
    pub fn new(calendar_dir: impl Into<PathBuf>) -> Self {
        let calendar_dir = calendar_dir.into();
        Self {
            picker_config: calendar_dir.join(Self::DEFAULT_PICKER_CONFIG),
            calendar_dir,
            timeedit_base_url: TimeEditConfig::DEFAULT_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(Self::DEFAULT_FETCH_TIMEOUT_SECS),
            tracing: TracingConfig::service(),
        }
    }

    /// Builder: set the picker configuration path.
    pub fn with_picker_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.picker_config = path.into();
        self
    }

    /// Builder: set the TimeEdit base URL.
    pub fn with_timeedit_base_url(mut self, url: impl Into<String>) -> Self {
        self.timeedit_base_url = url.into();
        self
    }

    /// Builder: set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builder: set the log output.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    /// Installs the global log subscriber. Call once, before serving.
    pub fn init_tracing(&self) -> ServerResult<()> {
        init_tracing(&self.tracing)?;
        Ok(())
    }

    /// Builds the TimeEdit provider configuration.
    pub fn timeedit(&self) -> ServerResult<TimeEditConfig> {
        TimeEditConfig::new(&self.timeedit_base_url)
            .map(|config| config.with_timeout(self.fetch_timeout))
            .map_err(|e| {
                ServerError::config(format!(
                    "invalid TimeEdit base URL {:?}: {}",
                    self.timeedit_base_url, e
                ))
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CALENDAR_DIR)
    }
}

/// Bit id of calendars that can never be selected.
pub const UNSELECTABLE_ID: i64 = -1;

/// One calendar offered by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerCalendar {
    /// File name inside the calendar directory.
    pub filename: String,
    /// Bit id in the selection mask, or `-1`.
    pub id: i64,
    /// Sort key within its category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Category path, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// Picker configuration: the calendars available for merging.
///
/// ```json
/// [
///   { "filename": "tda357.ics", "id": 0, "category": ["Chalmers", "D"] },
///   { "filename": "old.ics", "id": -1, "hidden": true }
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickerConfig {
    pub calendars: Vec<PickerCalendar>,
}

impl PickerConfig {
    /// Parses the JSON configuration.
    pub fn from_json(text: &str) -> ServerResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ServerError::config(format!("invalid picker config: {}", e)))
    }

    /// Calendars that can be addressed by the selection mask.
    pub fn selectable(&self) -> impl Iterator<Item = &PickerCalendar> {
        self.calendars.iter().filter(|c| c.id != UNSELECTABLE_ID)
    }

    /// `(filename, id)` pairs of the selectable calendars, in declared order.
    pub fn bit_entries(&self) -> Vec<(String, i64)> {
        self.selectable()
            .map(|c| (c.filename.clone(), c.id))
            .collect()
    }

    /// Calendars shown by the picker, sorted by category, order and name.
    pub fn visible(&self) -> Vec<&PickerCalendar> {
        let mut visible: Vec<_> = self.calendars.iter().filter(|c| !c.hidden).collect();
        visible.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.order.unwrap_or(i64::MAX).cmp(&b.order.unwrap_or(i64::MAX)))
                .then_with(|| a.filename.cmp(&b.filename))
        });
        visible
    }
}
