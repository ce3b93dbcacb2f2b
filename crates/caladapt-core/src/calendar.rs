//! Calendar model and ICS codec.
//!
//! [`Calendar`] and [`Event`] hold exactly what the adapter needs to read and
//! rewrite: the text fields it reformats, the date values it passes through
//! untouched, and any extension properties (such as `URL`) the source feed
//! carries. Parsing goes through the `icalendar` crate's parser and
//! serialization through its builder, so a serialize/parse round trip is the
//! canonical way to get an independent copy of a value ([`Calendar::deep_copy`],
//! [`Event::deep_copy`]).

use std::collections::BTreeMap;

use icalendar::parser::{self, read_calendar, unfold};
use icalendar::{Component, EventLike};
use tracing::{debug, trace};

use crate::error::{CoreError, CoreResult};

/// Calendar-level property carrying the display name.
const NAME_PROPERTY: &str = "X-WR-CALNAME";
/// Calendar-level property carrying the default timezone.
const TIMEZONE_PROPERTY: &str = "X-WR-TIMEZONE";
/// Calendar-level property carrying the description.
const DESCRIPTION_PROPERTY: &str = "X-WR-CALDESC";

/// Event properties that map to dedicated [`Event`] fields or are
/// regenerated on serialization.
const MODELLED_EVENT_PROPERTIES: &[&str] = &[
    "UID",
    "DTSTART",
    "DTEND",
    "DTSTAMP",
    "SUMMARY",
    "DESCRIPTION",
    "LOCATION",
];

/// A raw property value together with its parameters.
///
/// Used for date values (`DTSTART;TZID=Europe/Stockholm:20250205T100000`)
/// and extension properties, which the adapter passes through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    /// The raw value, as it appears after the colon.
    pub value: String,
    /// Property parameters in source order.
    pub params: Vec<(String, String)>,
}

impl PropertyValue {
    /// Creates a value without parameters.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
        }
    }

    /// Builder method to add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    fn from_parsed(property: &parser::Property<'_>) -> Self {
        Self {
            value: property.val.to_string(),
            params: property
                .params
                .iter()
                .map(|p| {
                    (
                        p.key.to_string(),
                        p.val.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                    )
                })
                .collect(),
        }
    }

    fn to_property(&self, name: &str) -> icalendar::Property {
        let mut property = icalendar::Property::new(name, &self.value);
        for (key, value) in &self.params {
            property.add_parameter(key, value);
        }
        property
    }
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Unique identifier (`UID`).
    pub uid: String,
    /// Start (`DTSTART`).
    pub start: PropertyValue,
    /// End (`DTEND`).
    pub end: PropertyValue,
    /// Summary (`SUMMARY`), unescaped.
    pub summary: Option<String>,
    /// Description (`DESCRIPTION`), unescaped.
    pub description: Option<String>,
    /// Location (`LOCATION`), unescaped.
    pub location: Option<String>,
    /// Every other property, keyed by upper-case name.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Event {
    /// Creates an event with the required fields.
    pub fn new(uid: impl Into<String>, start: PropertyValue, end: PropertyValue) -> Self {
        Self {
            uid: uid.into(),
            start,
            end,
            summary: None,
            description: None,
            location: None,
            properties: BTreeMap::new(),
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set an extension property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Reads an extension property value.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_ascii_uppercase())
            .map(|p| p.value.as_str())
    }

    /// Writes an extension property, replacing any previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(
            name.into().to_ascii_uppercase(),
            PropertyValue::new(value),
        );
    }

    /// Returns the event's `URL` property, if any.
    pub fn url(&self) -> Option<&str> {
        self.property("URL")
    }

    /// Returns an independent copy made by serializing the event and parsing
    /// it back.
    ///
    /// # Errors
    ///
    /// Fails when the event does not survive the round trip, e.g. an event
    /// with an empty `UID`.
    pub fn deep_copy(&self) -> CoreResult<Event> {
        let mut calendar = icalendar::Calendar::new();
        calendar.push(self.to_component());
        let text = calendar.done().to_string();

        let parsed = Calendar::parse(&text)?;
        parsed
            .events
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::parse(format!("event {} vanished on copy", self.uid)))
    }

    fn from_component(component: &parser::Component<'_>) -> CoreResult<Self> {
        let uid = component
            .find_prop("UID")
            .map(|p| p.val.to_string())
            .filter(|uid| !uid.trim().is_empty())
            .ok_or_else(|| CoreError::parse("VEVENT without UID"))?;

        let start = component
            .find_prop("DTSTART")
            .map(PropertyValue::from_parsed)
            .ok_or_else(|| CoreError::parse(format!("VEVENT {uid} without DTSTART")))?;

        // Missing end: treat as zero-length.
        let end = component
            .find_prop("DTEND")
            .map(PropertyValue::from_parsed)
            .unwrap_or_else(|| start.clone());

        let text = |name: &str| component.find_prop(name).map(|p| unescape_text(p.val.as_ref()));

        let properties = component
            .properties
            .iter()
            .filter(|p| !MODELLED_EVENT_PROPERTIES.contains(&p.name.as_ref()))
            .map(|p| (p.name.to_string(), PropertyValue::from_parsed(p)))
            .collect();

        Ok(Self {
            summary: text("SUMMARY"),
            description: text("DESCRIPTION"),
            location: text("LOCATION"),
            uid,
            start,
            end,
            properties,
        })
    }

    fn to_component(&self) -> icalendar::Event {
        let mut event = icalendar::Event::new();
        event.uid(&self.uid);
        event.append_property(self.start.to_property("DTSTART"));
        event.append_property(self.end.to_property("DTEND"));

        if let Some(ref summary) = self.summary {
            event.summary(&escape_text(summary));
        }
        if let Some(ref description) = self.description {
            event.description(&escape_text(description));
        }
        if let Some(ref location) = self.location {
            event.location(&escape_text(location));
        }
        for (name, value) in &self.properties {
            event.append_property(value.to_property(name));
        }

        event.done()
    }
}

/// A calendar: metadata plus an ordered list of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    /// Display name (`X-WR-CALNAME`).
    pub name: Option<String>,
    /// Default timezone (`X-WR-TIMEZONE`).
    pub timezone: Option<String>,
    /// Description (`X-WR-CALDESC`).
    pub description: Option<String>,
    /// Events in source order.
    pub events: Vec<Event>,
}

impl Calendar {
    /// Creates an empty, unnamed calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to append events.
    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// Parses ICS text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] carrying the parser's message when the
    /// text is not a calendar, or when an event lacks `UID` or `DTSTART`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let unfolded = unfold(text);
        let parsed = read_calendar(&unfolded).map_err(CoreError::parse)?;

        let calendar_text = |name: &str| {
            parsed
                .properties
                .iter()
                .find(|p| p.name.as_ref() == name)
                .map(|p| unescape_text(p.val.as_ref()))
        };

        let events = parsed
            .components
            .iter()
            .filter(|c| c.name.as_ref() == "VEVENT")
            .map(Event::from_component)
            .collect::<CoreResult<Vec<_>>>()?;

        let calendar = Self {
            name: calendar_text(NAME_PROPERTY),
            timezone: calendar_text(TIMEZONE_PROPERTY),
            description: calendar_text(DESCRIPTION_PROPERTY),
            events,
        };

        debug!(
            name = ?calendar.name,
            events = calendar.events.len(),
            "Parsed calendar"
        );

        Ok(calendar)
    }

    /// Serializes the calendar to ICS text.
    pub fn serialize(&self) -> String {
        let mut calendar = icalendar::Calendar::new();
        if let Some(ref name) = self.name {
            calendar.name(&escape_text(name));
        }
        if let Some(ref timezone) = self.timezone {
            calendar.timezone(timezone.as_str());
        }
        if let Some(ref description) = self.description {
            calendar.description(&escape_text(description));
        }
        for event in &self.events {
            calendar.push(event.to_component());
        }

        trace!(events = self.events.len(), "Serializing calendar");
        calendar.done().to_string()
    }

    /// Returns an independent copy made by serializing and re-parsing.
    ///
    /// # Errors
    ///
    /// Fails when any part of the calendar does not survive the round trip.
    pub fn deep_copy(&self) -> CoreResult<Calendar> {
        Calendar::parse(&self.serialize())
    }

    /// Returns the number of events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Applies RFC 5545 TEXT escaping; the inverse of [`unescape_text`].
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Reverses RFC 5545 TEXT escaping (`\n`, `\N`, `\,`, `\;`, `\\`).
fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
