//! Merging several calendars into one.

use tracing::{debug, warn};

use crate::calendar::{Calendar, Event};
use crate::error::{CoreError, CoreResult};

/// Separator between the names of merged calendars.
pub const NAME_SEPARATOR: &str = "+";

/// Merges calendars into a copy of the first one.
///
/// Events of every further calendar are deep-copied one by one and appended
/// in input order. An event that fails to copy is dropped with a warning;
/// the rest of the merge continues. With `append_origin_name`, each event
/// from a named calendar gets ` - <calendar name>` appended to its summary.
///
/// The merged name is every input name joined with `+`, or unset when no
/// input is named.
///
/// # Errors
///
/// Fails on an empty input, or when the first calendar cannot be copied.
pub fn merge(calendars: &[Calendar], append_origin_name: bool) -> CoreResult<Calendar> {
    let (first, rest) = calendars
        .split_first()
        .ok_or_else(|| CoreError::invalid_input("nothing to merge"))?;

    let mut merged = first.deep_copy()?;
    let mut names = Vec::with_capacity(calendars.len());

    if let Some(name) = first.name.as_deref() {
        if append_origin_name {
            for event in &mut merged.events {
                tag_origin(event, name);
            }
        }
        names.push(name);
    }

    for calendar in rest {
        let mut dropped = 0usize;
        for event in &calendar.events {
            match event.deep_copy() {
                Ok(mut copy) => {
                    if let (true, Some(name)) = (append_origin_name, calendar.name.as_deref()) {
                        tag_origin(&mut copy, name);
                    }
                    merged.events.push(copy);
                }
                Err(err) => {
                    warn!(
                        calendar = ?calendar.name,
                        uid = %event.uid,
                        error = %err,
                        "Dropping event that failed to copy"
                    );
                    dropped += 1;
                }
            }
        }
        if let Some(name) = calendar.name.as_deref() {
            names.push(name);
        }
        debug!(
            calendar = ?calendar.name,
            events = calendar.events.len(),
            dropped,
            "Merged calendar"
        );
    }

    merged.name = (!names.is_empty()).then(|| names.join(NAME_SEPARATOR));
    Ok(merged)
}

fn tag_origin(event: &mut Event, origin: &str) {
    if let Some(summary) = event.summary.as_mut() {
        summary.push_str(" - ");
        summary.push_str(origin);
    }
}
