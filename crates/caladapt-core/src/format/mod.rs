//! Event text formatting.
//!
//! Turns [`EventData`] extracted from a TimeEdit event back into readable
//! summary, description and location strings:
//!
//! - **Summary**: `Föreläsning: Databaser (TDA357)`
//! - **Description**: one `Label: value` row per fact
//! - **Location**: `HA1, HB2 (Johanneberg). Jupiter (Lindholmen)`
//!
//! Every formatter returns `None` when there is nothing to show and the
//! original event has no value to fall back to; callers remove the field in
//! that case.
//!
//! # Example
//!
//! ```
//! use caladapt_core::event_data::{EventData, keys};
//! use caladapt_core::format::format_course;
//!
//! let data = EventData::new()
//!     .with_values(keys::COURSE_NAME, ["Databaser"])
//!     .with_values(keys::COURSE_CODE, ["TDA357_VT25"]);
//! assert_eq!(format_course(&data).as_deref(), Some("Databaser (TDA357)"));
//! ```


use crate::calendar::Event;
use crate::event_data::{EventData, denormalize_label, keys};

/// Title fragment marking a remote session.
pub const REMOTE_MARKER: &str = "Distans";

/// Location shown for remote sessions.
pub const REMOTE_LOCATION: &str = "Online";

/// Keys rendered by dedicated rows or fields; everything else gets a
/// generic description row.
const RECOGNIZED_KEYS: &[&str] = &[
    keys::TITLE,
    keys::ACTIVITY,
    keys::COURSE_NAME,
    keys::COURSE_CODE,
    keys::CLASS_CODE,
    keys::ROOM,
    keys::CAMPUS,
    keys::MAP_LINK,
];

const LIST_SEPARATOR: &str = ", ";

/// Formats the course part: `"<names> (<short codes>)"`.
///
/// A short code is the part of a course code before its first underscore,
/// so `TDA357_VT25` becomes `TDA357`. Returns `None` when the data has
/// neither names nor codes.
pub fn format_course(data: &EventData) -> Option<String> {
    let names = data.get(keys::COURSE_NAME).join(LIST_SEPARATOR);

    let mut codes: Vec<&str> = Vec::new();
    for code in data.get(keys::COURSE_CODE) {
        let short = code.split('_').next().unwrap_or(code);
        if !short.is_empty() && !codes.contains(&short) {
            codes.push(short);
        }
    }
    let codes = codes.join(LIST_SEPARATOR);

    match (names.is_empty(), codes.is_empty()) {
        (true, true) => None,
        (false, true) => Some(names),
        (true, false) => Some(codes),
        (false, false) => Some(format!("{names} ({codes})")),
    }
}

/// Formats the summary.
///
/// Explicit titles win. Otherwise the summary is `"<activities>: <course>"`,
/// degrading to whichever half exists.
pub fn format_summary(data: &EventData, original: Option<&Event>) -> Option<String> {
    let titles = data.get(keys::TITLE);
    if !titles.is_empty() {
        return Some(titles.join(LIST_SEPARATOR));
    }

    let activities = data.get(keys::ACTIVITY).join(LIST_SEPARATOR);
    let summary = match format_course(data) {
        Some(course) if activities.is_empty() => course,
        Some(course) => format!("{activities}: {course}"),
        None => activities,
    };

    non_empty(summary).or_else(|| original.and_then(|e| e.summary.clone()))
}

/// Formats the description as newline-separated `Label: value` rows.
///
/// Fixed rows come first (activity, course, class, map link), followed by
/// every unrecognized key sorted by label. The map row falls back to the
/// event's own `URL` property.
pub fn format_description(data: &EventData, original: Option<&Event>) -> Option<String> {
    let map_link = non_empty(data.get(keys::MAP_LINK).join(LIST_SEPARATOR))
        .or_else(|| original.and_then(|e| e.url()).map(str::to_string));

    let mut rows = vec![
        row("Activity", &data.get(keys::ACTIVITY).join(LIST_SEPARATOR)),
        row("Course", &format_course(data).unwrap_or_default()),
        row("Class", &data.get(keys::CLASS_CODE).join(LIST_SEPARATOR)),
        row("Map", &map_link.unwrap_or_default()),
    ];

    let mut extra: Vec<(String, String)> = data
        .iter()
        .filter(|(key, _)| !RECOGNIZED_KEYS.contains(key))
        .map(|(key, values)| (denormalize_label(key), values.join(LIST_SEPARATOR)))
        .collect();
    extra.sort();
    rows.extend(extra.iter().map(|(label, values)| row(label, values)));

    let description = rows.into_iter().flatten().collect::<Vec<_>>().join("\n");
    non_empty(description).or_else(|| original.and_then(|e| e.description.clone()))
}

/// Formats the location from correlated room and campus lists.
pub fn format_location(data: &EventData, original: Option<&Event>) -> Option<String> {
    if data
        .get(keys::TITLE)
        .iter()
        .any(|title| title.contains(REMOTE_MARKER))
    {
        return Some(REMOTE_LOCATION.to_string());
    }

    let rooms = data.get(keys::ROOM);
    let campuses = data.get(keys::CAMPUS);

    let location = if campuses.is_empty() {
        rooms.join(LIST_SEPARATOR)
    } else if rooms.is_empty() {
        campuses.join(LIST_SEPARATOR)
    } else if rooms.len() != campuses.len() {
        let mut unique: Vec<&str> = Vec::new();
        for campus in campuses {
            if !unique.contains(&campus.as_str()) {
                unique.push(campus.as_str());
            }
        }
        format!(
            "{} ({})",
            rooms.join(LIST_SEPARATOR),
            unique.join(LIST_SEPARATOR)
        )
    } else {
        let mut by_campus: Vec<(&str, Vec<&str>)> = Vec::new();
        for (room, campus) in rooms.iter().zip(campuses) {
            match by_campus.iter_mut().find(|(c, _)| *c == campus.as_str()) {
                Some((_, grouped)) => grouped.push(room.as_str()),
                None => by_campus.push((campus.as_str(), vec![room.as_str()])),
            }
        }
        by_campus
            .iter()
            .map(|(campus, grouped)| format!("{} ({campus})", grouped.join(LIST_SEPARATOR)))
            .collect::<Vec<_>>()
            .join(". ")
    };

    non_empty(location).or_else(|| original.and_then(|e| e.location.clone()))
}

/// Rewrites an event's summary, description and location in place.
///
/// Data is extracted from the current summary and location; fields for
/// which the formatters return `None` are removed.
pub fn format_event(event: &mut Event) {
    let data = EventData::parse(
        [event.summary.as_deref(), event.location.as_deref()]
            .into_iter()
            .flatten(),
    );

    let original = &*event;
    let summary = format_summary(&data, Some(original));
    let description = format_description(&data, Some(original));
    let location = format_location(&data, Some(original));

    event.summary = summary;
    event.description = description;
    event.location = location;
}

fn row(label: &str, value: &str) -> Option<String> {
    (!value.is_empty()).then(|| format!("{label}: {value}"))
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::tests::event;

    fn rooms_and_campuses(rooms: &[&str], campuses: &[&str]) -> EventData {
        EventData::new()
            .with_values(keys::ROOM, rooms.iter().copied())
            .with_values(keys::CAMPUS, campuses.iter().copied())
    }

    #[test]
    fn course_with_name_and_code() {
        let data = EventData::new()
            .with_values(keys::COURSE_NAME, ["Lorem ipsum"])
            .with_values(keys::COURSE_CODE, ["ABC123"]);
        assert_eq!(format_course(&data).as_deref(), Some("Lorem ipsum (ABC123)"));
    }

    #[test]
    fn course_of_empty_data_is_none() {
        assert_eq!(format_course(&EventData::new()), None);
    }

    #[test]
    fn course_codes_are_shortened_and_deduplicated() {
        let data = EventData::new()
            .with_values(keys::COURSE_CODE, ["TDA357_VT25", "TDA357_HT24", "DIT621_VT25"]);
        assert_eq!(format_course(&data).as_deref(), Some("TDA357, DIT621"));
    }

    #[test]
    fn summary_prefers_title() {
        let data = EventData::new()
            .with_values(keys::TITLE, ["Tentamen", "Omtenta"])
            .with_values(keys::ACTIVITY, ["Föreläsning"]);
        assert_eq!(
            format_summary(&data, None).as_deref(),
            Some("Tentamen, Omtenta")
        );
    }

    #[test]
    fn summary_combines_activity_and_course() {
        let data = EventData::new()
            .with_values(keys::ACTIVITY, ["Föreläsning"])
            .with_values(keys::COURSE_NAME, ["Databaser"])
            .with_values(keys::COURSE_CODE, ["TDA357_VT25"]);
        assert_eq!(
            format_summary(&data, None).as_deref(),
            Some("Föreläsning: Databaser (TDA357)")
        );
    }

    #[test]
    fn summary_without_course_drops_the_colon() {
        let data = EventData::new().with_values(keys::ACTIVITY, ["Övning"]);
        assert_eq!(format_summary(&data, None).as_deref(), Some("Övning"));
    }

    #[test]
    fn summary_falls_back_to_original() {
        let original = event("a", "Unparsed summary");
        assert_eq!(
            format_summary(&EventData::new(), Some(&original)).as_deref(),
            Some("Unparsed summary")
        );
        assert_eq!(format_summary(&EventData::new(), None), None);
    }

    #[test]
    fn description_rows_in_fixed_order_then_sorted_extras() {
        let data = EventData::new()
            .with_values("lärare", ["Ada"])
            .with_values("avdelning", ["CSE"])
            .with_values(keys::MAP_LINK, ["https://maps.example.com/ha1"])
            .with_values(keys::CLASS_CODE, ["TKDAT-1", "TKITE-2"])
            .with_values(keys::ACTIVITY, ["Föreläsning"]);

        assert_eq!(
            format_description(&data, None).as_deref(),
            Some(
                "Activity: Föreläsning\n\
                 Class: TKDAT-1, TKITE-2\n\
                 Map: https://maps.example.com/ha1\n\
                 Avdelning: CSE\n\
                 Lärare: Ada"
            )
        );
    }

    #[test]
    fn description_map_row_uses_event_url() {
        let original = event("a", "x").with_property("URL", "https://cloud.timeedit.net/r.html");
        let data = EventData::new().with_values(keys::ACTIVITY, ["Lab"]);

        assert_eq!(
            format_description(&data, Some(&original)).as_deref(),
            Some("Activity: Lab\nMap: https://cloud.timeedit.net/r.html")
        );
    }

    #[test]
    fn description_falls_back_to_original() {
        let original = event("a", "x").with_description("ID 1234");
        assert_eq!(
            format_description(&EventData::new(), Some(&original)).as_deref(),
            Some("ID 1234")
        );
        assert_eq!(format_description(&EventData::new(), None), None);
    }

    #[test]
    fn location_groups_rooms_per_campus() {
        let data = rooms_and_campuses(
            &["HA1", "Jupiter", "HB2", "HC4"],
            &["Johanneberg", "Lindholmen", "Johanneberg", "Johanneberg"],
        );
        assert_eq!(
            format_location(&data, None).as_deref(),
            Some("HA1, HB2, HC4 (Johanneberg). Jupiter (Lindholmen)")
        );
    }

    #[test]
    fn location_with_mismatched_lengths() {
        let data = rooms_and_campuses(
            &["HA1", "HB2", "Jupiter"],
            &["Johanneberg", "Lindholmen", "Johanneberg", "Lindholmen"],
        );
        assert_eq!(
            format_location(&data, None).as_deref(),
            Some("HA1, HB2, Jupiter (Johanneberg, Lindholmen)")
        );
    }

    #[test]
    fn location_keeps_repeated_rooms_on_a_single_campus() {
        let data = EventData::parse(["Lokalnamn: HA1, Lokalnamn: HA1", "Campus: J, Campus: J"]);
        assert_eq!(format_location(&data, None).as_deref(), Some("HA1, HA1 (J)"));

        let data = EventData::parse([
            "Lokalnamn: HA1, Lokalnamn: HA1, Lokalnamn: HB2",
            "Campus: J, Campus: L",
        ]);
        assert_eq!(
            format_location(&data, None).as_deref(),
            Some("HA1, HA1, HB2 (J, L)")
        );
    }

    #[test]
    fn location_with_only_rooms_or_only_campuses() {
        let rooms = rooms_and_campuses(&["HA1", "HB2"], &[]);
        assert_eq!(format_location(&rooms, None).as_deref(), Some("HA1, HB2"));

        let campuses = rooms_and_campuses(&[], &["Lindholmen"]);
        assert_eq!(
            format_location(&campuses, None).as_deref(),
            Some("Lindholmen")
        );
    }

    #[test]
    fn remote_title_overrides_location() {
        let data = rooms_and_campuses(&["HA1"], &["Johanneberg"])
            .with_values(keys::TITLE, ["Distansföreläsning"]);
        assert_eq!(format_location(&data, None).as_deref(), Some(REMOTE_LOCATION));
    }

    #[test]
    fn location_falls_back_to_original() {
        let original = event("a", "x").with_location("Somewhere");
        assert_eq!(
            format_location(&EventData::new(), Some(&original)).as_deref(),
            Some("Somewhere")
        );
    }

    #[test]
    fn format_event_removes_empty_fields() {
        let mut bare = event("a", "");
        bare.summary = None;
        format_event(&mut bare);

        assert_eq!(bare.summary, None);
        assert_eq!(bare.description, None);
        assert_eq!(bare.location, None);
    }
}
