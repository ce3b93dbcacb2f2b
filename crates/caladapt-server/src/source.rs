//! Sources of the calendars offered for merging.

use std::path::{Path, PathBuf};

use caladapt_core::Calendar;
use caladapt_providers::BoxFuture;
use tracing::debug;

use crate::error::{ServerError, ServerResult};

/// Loads calendars by the file name listed in the picker configuration.
pub trait CalendarSource: Send + Sync {
    fn load<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ServerResult<Calendar>>;
}

/// Reads `<root>/<name>` ICS files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a plain file name inside the root.
    ///
    /// Names with path separators, a leading dot or `..` are rejected.
    fn resolve(&self, name: &str) -> ServerResult<PathBuf> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !plain {
            return Err(ServerError::invalid_calendar_name(name));
        }
        Ok(self.root.join(name))
    }
}

impl CalendarSource for DirectorySource {
    fn load<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ServerResult<Calendar>> {
        Box::pin(async move {
            let path = self.resolve(name)?;
            let text = tokio::fs::read_to_string(&path).await?;
            let calendar = Calendar::parse(&text)?;
            debug!(
                path = %path.display(),
                events = calendar.event_count(),
                "Loaded calendar"
            );
            Ok(calendar)
        })
    }
}
