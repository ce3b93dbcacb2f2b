//! Content-hash keyed cache for parsed configuration.
//!
//! The picker configuration is re-read on every merge request but only
//! re-parsed when its content changes. Entries are keyed by the SHA-256 of
//! the raw text, so an edit to the file is picked up on the next request
//! without any file watching.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// Returns the lowercase hex SHA-256 of `content`.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Holds the value parsed from the most recently seen content.
#[derive(Debug)]
pub struct ConfigCache<T> {
    entry: Option<CacheEntry<T>>,
}

#[derive(Debug)]
struct CacheEntry<T> {
    hash: String,
    value: Arc<T>,
}

impl<T> Default for ConfigCache<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> ConfigCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if it was parsed from content with `hash`.
    pub fn lookup(&self, hash: &str) -> Option<Arc<T>> {
        self.entry
            .as_ref()
            .filter(|entry| entry.hash == hash)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Stores `value` as parsed from content with `hash`, replacing any
    /// previous entry.
    pub fn populate(&mut self, hash: impl Into<String>, value: T) -> Arc<T> {
        let hash = hash.into();
        let value = Arc::new(value);
        debug!(hash = %hash, "Populated config cache");
        self.entry = Some(CacheEntry {
            hash,
            value: Arc::clone(&value),
        });
        value
    }

    /// Drops the cached value unless it was parsed from content with
    /// `hash`. Returns true if an entry was dropped.
    pub fn invalidate_if_changed(&mut self, hash: &str) -> bool {
        let changed = self.entry.as_ref().is_some_and(|entry| entry.hash != hash);
        if changed {
            debug!(hash = %hash, "Config content changed, invalidating cache");
            self.entry = None;
        }
        changed
    }

    /// Returns the value for `content`, parsing it only when the content
    /// differs from the cached one.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the cache is left empty in that case.
    pub fn get_or_populate<E, F>(&mut self, content: &str, parse: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&str) -> Result<T, E>,
    {
        let hash = content_hash(content);
        if let Some(value) = self.lookup(&hash) {
            trace!(hash = %hash, "Config cache hit");
            return Ok(value);
        }
        self.invalidate_if_changed(&hash);
        let value = parse(content)?;
        Ok(self.populate(hash, value))
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
