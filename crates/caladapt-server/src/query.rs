//! Query-string parsing for the adapt and merge routes.
//!
//! | parameter | meaning |
//! |-----------|---------|
//! | `id`      | provider calendar id |
//! | `group`   | index into [`GROUPABLE_PROPERTIES`](caladapt_core::GROUPABLE_PROPERTIES) |
//! | `gi`      | space-separated combination keys to keep |
//! | `f`       | serialized [`FilterSlicer`] |
//! | `fg`      | filter slicer group to return |
//! | `origin`  | `false`, `0` or `f` disable origin tagging when merging |

use caladapt_core::{FilterSlicer, PropertyGroupSelection, Slicer};
use caladapt_providers::{AdaptOptions, FilterSelection};
use tracing::trace;

use crate::error::{ServerError, ServerResult};

/// Values of `origin` that disable origin tagging, compared case-insensitively.
const ORIGIN_DISABLED: &[&str] = &["false", "0", "f"];

/// Decoded `key=value` pairs in query order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decodes a query string, with or without the leading `?`.
    ///
    /// `+` decodes to a space.
    ///
    /// # Errors
    ///
    /// Fails on percent-escapes that do not decode to UTF-8.
    pub fn parse(query: &str) -> ServerResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Ok((decode(key)?, decode(value)?))
            })
            .collect::<ServerResult<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    /// Returns the first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn index(&self, key: &str) -> ServerResult<Option<usize>> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<usize>().map_err(|_| {
                    ServerError::invalid_query(format!(
                        "{key} must be a non-negative integer, got {raw:?}"
                    ))
                })
            })
            .transpose()
    }
}

fn decode(raw: &str) -> ServerResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ServerError::invalid_query(format!("cannot decode {raw:?}: {e}")))
}

/// Parameters of the adapt route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptQuery {
    pub id: String,
    /// `(group, gi)`
    pub grouping: Option<(usize, String)>,
    /// `(f, fg)`
    pub filter: Option<(String, usize)>,
}

impl AdaptQuery {
    /// Parses an adapt query string.
    ///
    /// # Errors
    ///
    /// Fails when `id` is missing, when `group`/`gi` or `f`/`fg` appear
    /// without their partner, or when an index is not an integer.
    pub fn from_query(query: &str) -> ServerResult<Self> {
        Self::from_params(&QueryParams::parse(query)?)
    }

    pub fn from_params(params: &QueryParams) -> ServerResult<Self> {
        let id = params
            .get("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServerError::invalid_query("missing id"))?
            .to_string();

        let grouping = match (params.index("group")?, params.get("gi")) {
            (Some(group), Some(include)) => Some((group, include.to_string())),
            (None, None) => None,
            (Some(_), None) => return Err(ServerError::invalid_query("group requires gi")),
            (None, Some(_)) => return Err(ServerError::invalid_query("gi requires group")),
        };

        let filter = match (params.get("f"), params.index("fg")?) {
            (Some(filters), Some(group)) => Some((filters.to_string(), group)),
            (None, None) => None,
            (Some(_), None) => return Err(ServerError::invalid_query("f requires fg")),
            (None, Some(_)) => return Err(ServerError::invalid_query("fg requires f")),
        };

        let query = Self {
            id,
            grouping,
            filter,
        };
        trace!(?query, "Parsed adapt query");
        Ok(query)
    }

    /// Builds the pipeline options, validating the grouping index, the
    /// filter grammar and the filter group index.
    pub fn adapt_options(&self) -> ServerResult<AdaptOptions> {
        let mut options = AdaptOptions::new();
        if let Some((group, ref include)) = self.grouping {
            options = options.with_grouping(PropertyGroupSelection::new(group, include)?);
        }
        if let Some((ref filters, group)) = self.filter {
            let slicer = FilterSlicer::from_serialized(filters)?;
            if group >= slicer.size() {
                return Err(ServerError::invalid_query(format!(
                    "fg {group} out of range, {filters:?} has {} groups",
                    slicer.size()
                )));
            }
            options = options.with_filter(FilterSelection::new(slicer, group));
        }
        Ok(options)
    }
}

/// Parameters of the merge route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeQuery {
    /// Append each source calendar's name to its event summaries.
    pub origin: bool,
}

impl Default for MergeQuery {
    fn default() -> Self {
        Self { origin: true }
    }
}

impl MergeQuery {
    pub fn from_query(query: &str) -> ServerResult<Self> {
        Ok(Self::from_params(&QueryParams::parse(query)?))
    }

    pub fn from_params(params: &QueryParams) -> Self {
        let origin = params.get("origin").is_none_or(|raw| {
            !ORIGIN_DISABLED
                .iter()
                .any(|disabled| raw.trim().eq_ignore_ascii_case(disabled))
        });
        Self { origin }
    }
}
