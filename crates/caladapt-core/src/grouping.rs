//! Grouping of events by the value combination of one extracted property.
//!
//! A selection is addressed by `group` (an index into
//! [`GROUPABLE_PROPERTIES`]) and `gi` (the space-separated combination keys
//! to keep). Grouping reads the raw event text, so it runs before the events
//! are reformatted.

use std::collections::BTreeSet;

use tracing::debug;

use crate::calendar::Event;
use crate::error::{CoreError, CoreResult};
use crate::event_data::{EventData, keys};
use crate::slicer::{HashSlicer, Slicer};

/// Properties a calendar can be grouped by, addressed by index.
pub const GROUPABLE_PROPERTIES: [&str; 5] = [
    keys::ACTIVITY,
    keys::COURSE_CODE,
    keys::CLASS_CODE,
    keys::ROOM,
    keys::CAMPUS,
];

/// Lowercases a value and replaces every character outside `[a-z0-9]`
/// with `-`.
///
/// ```
/// use caladapt_core::grouping::comparison_key;
///
/// assert_eq!(comparison_key("Föreläsning 1"), "f-rel-sning-1");
/// ```
pub fn comparison_key(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Normalizes each value, drops empties, sorts and joins with `_`.
pub fn combination_key<S: AsRef<str>>(values: &[S]) -> String {
    let mut normalized: Vec<String> = values
        .iter()
        .map(|v| comparison_key(v.as_ref()))
        .filter(|k| !k.is_empty())
        .collect();
    normalized.sort();
    normalized.join("_")
}

/// Keeps only events whose property combination key is in an include set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyGroupSelection {
    property: &'static str,
    include: BTreeSet<String>,
}

impl PropertyGroupSelection {
    /// Creates a selection for the property at `index`.
    ///
    /// `include` is the space-separated `gi` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when `index` does not address a
    /// groupable property.
    pub fn new(index: usize, include: &str) -> CoreResult<Self> {
        let property = GROUPABLE_PROPERTIES.get(index).copied().ok_or_else(|| {
            CoreError::invalid_input(format!(
                "group index {index} out of range, {} properties are groupable",
                GROUPABLE_PROPERTIES.len()
            ))
        })?;
        let include = include.split_whitespace().map(str::to_string).collect();
        Ok(Self { property, include })
    }

    /// Returns the canonical key of the grouped property.
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Returns the combination key of one event for this property.
    pub fn key_of(&self, event: &Event) -> String {
        property_key(self.property, event)
    }

    /// Lists the distinct combination keys present in `events`, sorted.
    pub fn keys_for(&self, events: &[Event]) -> Vec<String> {
        available_keys(self.property, events)
    }

    /// Keeps the events whose combination key is included, in order.
    ///
    /// Events are split by a two-group [`HashSlicer`] whose hash is `1` for
    /// included events.
    pub fn apply(&self, events: Vec<Event>) -> CoreResult<Vec<Event>> {
        let before = events.len();
        let slicer = HashSlicer::new(
            |event: &Event| i64::from(self.include.contains(&self.key_of(event))),
            2,
        )?;
        let kept = slicer.get_group(events, 1)?;
        debug!(
            property = self.property,
            before,
            kept = kept.len(),
            "Applied property grouping"
        );
        Ok(kept)
    }
}

/// Lists the distinct combination keys of the property at `index`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] when `index` does not address a
/// groupable property.
pub fn keys_for_index(index: usize, events: &[Event]) -> CoreResult<Vec<String>> {
    PropertyGroupSelection::new(index, "").map(|s| s.keys_for(events))
}

fn property_key(property: &str, event: &Event) -> String {
    let sources = [event.summary.as_deref(), event.location.as_deref()];
    let data = EventData::parse(sources.into_iter().flatten());
    combination_key(data.get(property))
}

fn available_keys(property: &str, events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| property_key(property, event))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
