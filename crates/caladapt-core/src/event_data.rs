//! Key/value extraction from packed event text.
//!
//! TimeEdit exports pack everything into the summary and location fields,
//! e.g. `Kurskod: TDA357_VT25, Kursnamn: Databaser, Aktivitet: Föreläsning`.
//! [`EventData::parse`] pulls those `<label>: <value>` spans apart into a
//! multi-valued map keyed by canonical (lowercased, synonym-translated)
//! labels.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Canonical keys produced by the synonym table.
pub mod keys {
    /// Free-form title; overrides the composed summary.
    pub const TITLE: &str = "title";
    /// Activity kind (lecture, exercise, exam).
    pub const ACTIVITY: &str = "activity";
    /// Human-readable course name.
    pub const COURSE_NAME: &str = "course name";
    /// Course code, possibly suffixed with `_<term>`.
    pub const COURSE_CODE: &str = "course code";
    /// Student group code.
    pub const CLASS_CODE: &str = "class code";
    /// Room name; positionally correlated with [`CAMPUS`].
    pub const ROOM: &str = "room";
    /// Campus name; positionally correlated with [`ROOM`].
    pub const CAMPUS: &str = "campus";
    /// Link to a map of the room.
    pub const MAP_LINK: &str = "map link";
}

/// Presentation labels (Swedish and English exports) and their canonical key.
const SYNONYMS: &[(&str, &str)] = &[
    ("titel", keys::TITLE),
    ("aktivitet", keys::ACTIVITY),
    ("kursnamn", keys::COURSE_NAME),
    ("kurs namn", keys::COURSE_NAME),
    ("kurskod", keys::COURSE_CODE),
    ("kurs kod", keys::COURSE_CODE),
    ("klasskod", keys::CLASS_CODE),
    ("klass kod", keys::CLASS_CODE),
    ("lokalnamn", keys::ROOM),
    ("lokal", keys::ROOM),
    ("room name", keys::ROOM),
    ("kartlänk", keys::MAP_LINK),
];

/// A label: free text without reserved punctuation, then a colon followed by
/// whitespace or the end of the text. `https://` and `10:15` never match.
static LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^:,.;?&/()\r\n]+):(?:\s+|$)").expect("Invalid label regex")
});

/// Normalized multi-valued data extracted from an event's text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventData {
    values: BTreeMap<String, Vec<String>>,
}

impl EventData {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set all values of a key.
    pub fn with_values<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.insert(
            normalize_label(key),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Extracts data from the given text sources, in order.
    pub fn parse<'a>(sources: impl IntoIterator<Item = &'a str>) -> Self {
        let mut data = Self::new();
        for source in sources {
            data.extract(source);
        }
        data.correlate_rooms();
        trace!(keys = data.values.len(), "Extracted event data");
        data
    }

    /// Returns the values of a key, or an empty slice.
    pub fn get(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if the key has at least one value.
    pub fn contains(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    /// Iterates over keys and their values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns true if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn extract(&mut self, source: &str) {
        let labels: Vec<_> = LABEL_REGEX.captures_iter(source).collect();

        for (i, caps) in labels.iter().enumerate() {
            let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value_end = labels
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(source.len(), |m| m.start());
            let value = clean_value(&source[whole.end()..value_end]);
            if value.is_empty() {
                continue;
            }
            self.push(normalize_label(label.as_str()), value.to_string());
        }
    }

    fn push(&mut self, key: String, value: String) {
        let keep_duplicates = key == keys::ROOM || key == keys::CAMPUS;
        let values = self.values.entry(key).or_default();
        if keep_duplicates || !values.contains(&value) {
            values.push(value);
        }
    }

    /// Collapses duplicated room/campus entries once all sources are read.
    fn correlate_rooms(&mut self) {
        let mut rooms = self.values.remove(keys::ROOM).unwrap_or_default();
        let mut campuses = self.values.remove(keys::CAMPUS).unwrap_or_default();

        let single_campus = campuses
            .first()
            .is_some_and(|first| campuses.iter().all(|c| c == first));

        if single_campus {
            campuses.truncate(1);
        } else if rooms.len() == campuses.len() {
            for i in (0..rooms.len()).rev() {
                let seen_before =
                    (0..i).any(|j| rooms[j] == rooms[i] && campuses[j] == campuses[i]);
                if seen_before {
                    rooms.remove(i);
                    campuses.remove(i);
                }
            }
        }

        if !rooms.is_empty() {
            self.values.insert(keys::ROOM.to_string(), rooms);
        }
        if !campuses.is_empty() {
            self.values.insert(keys::CAMPUS.to_string(), campuses);
        }
    }
}

/// Lowercases a label, collapses whitespace and applies the synonym table.
pub fn normalize_label(label: &str) -> String {
    let normalized = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == normalized)
        .map_or(normalized, |(_, canonical)| canonical.to_string())
}

/// Turns a canonical key back into a presentation label.
pub fn denormalize_label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn clean_value(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches([',', '.', ';'])
        .trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_and_room_from_separate_sources() {
        let data = EventData::parse(["Activity: A", "Lokalnamn: B"]);

        assert_eq!(data.get(keys::ACTIVITY), ["A"]);
        assert_eq!(data.get(keys::ROOM), ["B"]);
        assert_eq!(data.iter().count(), 2);
    }

    #[test]
    fn single_campus_collapses() {
        let data = EventData::parse(["Campus: A. Campus: A, Campus: A"]);
        assert_eq!(data.get(keys::CAMPUS), ["A"]);
    }

    #[test]
    fn no_sources_or_no_labels_is_empty() {
        assert!(EventData::parse(std::iter::empty::<&str>()).is_empty());
        assert!(EventData::parse(["just some free text"]).is_empty());
    }

    #[test]
    fn packed_timeedit_summary() {
        let data = EventData::parse([
            "Kurskod: TDA357_VT25, Kurskod: DIT621_VT25, Kursnamn: Databaser, Aktivitet: Föreläsning",
        ]);

        assert_eq!(data.get(keys::COURSE_CODE), ["TDA357_VT25", "DIT621_VT25"]);
        assert_eq!(data.get(keys::COURSE_NAME), ["Databaser"]);
        assert_eq!(data.get(keys::ACTIVITY), ["Föreläsning"]);
    }

    #[test]
    fn duplicate_values_are_skipped() {
        let data = EventData::parse(["Klasskod: TKDAT-1, Klasskod: TKDAT-1", "Klass kod: TKDAT-2"]);
        assert_eq!(data.get(keys::CLASS_CODE), ["TKDAT-1", "TKDAT-2"]);
    }

    #[test]
    fn unseparated_free_text_joins_the_label() {
        let data = EventData::parse(["Extra pass Aktivitet: Övning"]);
        assert_eq!(data.get("extra pass aktivitet"), ["Övning"]);
    }

    #[test]
    fn leading_free_text_is_dropped() {
        let data = EventData::parse(["Extra pass, Aktivitet: Övning"]);
        assert_eq!(data.get(keys::ACTIVITY), ["Övning"]);
        assert_eq!(data.iter().count(), 1);
    }

    #[test]
    fn urls_and_times_are_values_not_labels() {
        let data = EventData::parse([
            "Kartlänk: https://maps.chalmers.se/#05137ad7, Tid: 10:15",
        ]);

        assert_eq!(
            data.get(keys::MAP_LINK),
            ["https://maps.chalmers.se/#05137ad7"]
        );
        assert_eq!(data.get("tid"), ["10:15"]);
    }

    #[test]
    fn correlated_pairs_are_deduplicated_from_the_end() {
        let data = EventData::parse([
            "Lokalnamn: HA1, Lokalnamn: Jupiter, Lokalnamn: HA1",
            "Campus: Johanneberg, Campus: Lindholmen, Campus: Johanneberg",
        ]);

        assert_eq!(data.get(keys::ROOM), ["HA1", "Jupiter"]);
        assert_eq!(data.get(keys::CAMPUS), ["Johanneberg", "Lindholmen"]);
    }

    #[test]
    fn same_room_on_different_campuses_is_kept() {
        let data = EventData::parse([
            "Lokalnamn: Sal 1, Campus: Johanneberg, Lokalnamn: Sal 1, Campus: Lindholmen",
        ]);

        assert_eq!(data.get(keys::ROOM), ["Sal 1", "Sal 1"]);
        assert_eq!(data.get(keys::CAMPUS), ["Johanneberg", "Lindholmen"]);
    }

    #[test]
    fn single_campus_keeps_every_room() {
        let data = EventData::parse([
            "Lokalnamn: HA1, Lokalnamn: HA1, Lokalnamn: HB2",
            "Campus: Johanneberg, Campus: Johanneberg",
        ]);

        assert_eq!(data.get(keys::ROOM), ["HA1", "HA1", "HB2"]);
        assert_eq!(data.get(keys::CAMPUS), ["Johanneberg"]);
    }

    #[test]
    fn mismatched_room_and_campus_lists_are_left_alone() {
        let data = EventData::parse([
            "Lokalnamn: HA1, Lokalnamn: HA1, Lokalnamn: HB2",
            "Campus: Johanneberg, Campus: Lindholmen",
        ]);

        assert_eq!(data.get(keys::ROOM), ["HA1", "HA1", "HB2"]);
        assert_eq!(data.get(keys::CAMPUS), ["Johanneberg", "Lindholmen"]);
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label("  Kurs   Namn "), keys::COURSE_NAME);
        assert_eq!(normalize_label("Lokalnamn"), keys::ROOM);
        assert_eq!(normalize_label("Lärare"), "lärare");
        assert_eq!(denormalize_label("lärare"), "Lärare");
        assert_eq!(denormalize_label(""), "");
    }
}
