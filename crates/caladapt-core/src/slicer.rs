//! Slicers: strategies that partition an event list into ordered groups.
//!
//! - [`HashSlicer`] buckets events by a hash function modulo a fixed size.
//! - [`FilterSlicer`] lets each [`Filter`] claim the events it matches, in
//!   order, leaving a trailing group of unmatched events.
//!
//! Both are built per request and consume the events they partition.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::calendar::Event;
use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;

/// Partitions events into an ordered set of groups.
pub trait Slicer {
    /// Returns the number of groups this slicer produces.
    fn size(&self) -> usize;

    /// Partitions events into exactly [`size`](Slicer::size) groups,
    /// preserving relative order within each group.
    fn group_events(&self, events: Vec<Event>) -> Vec<Vec<Event>>;

    /// Returns a single group.
    ///
    /// The full partition is recomputed on every call.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when `index` is not below
    /// [`size`](Slicer::size).
    fn get_group(&self, events: Vec<Event>, index: usize) -> CoreResult<Vec<Event>> {
        let size = self.size();
        if index >= size {
            return Err(CoreError::invalid_input(format!(
                "group index {index} out of range, slicer has {size} groups"
            )));
        }
        Ok(self
            .group_events(events)
            .into_iter()
            .nth(index)
            .unwrap_or_default())
    }
}

/// Buckets events by `|hash(event)| mod size`.
pub struct HashSlicer<H> {
    hash: H,
    size: usize,
}

impl<H> HashSlicer<H>
where
    H: Fn(&Event) -> i64,
{
    /// Creates a hash slicer with `size` groups.
    ///
    /// # Errors
    ///
    /// A slicer needs at least one group.
    pub fn new(hash: H, size: usize) -> CoreResult<Self> {
        if size == 0 {
            return Err(CoreError::invalid_input("hash slicer needs at least one group"));
        }
        Ok(Self { hash, size })
    }

    fn bucket(&self, event: &Event) -> usize {
        ((self.hash)(event).unsigned_abs() % self.size as u64) as usize
    }
}

impl<H> Slicer for HashSlicer<H>
where
    H: Fn(&Event) -> i64,
{
    fn size(&self) -> usize {
        self.size
    }

    fn group_events(&self, events: Vec<Event>) -> Vec<Vec<Event>> {
        let mut groups: Vec<Vec<Event>> = (0..self.size).map(|_| Vec::new()).collect();
        for event in events {
            let bucket = self.bucket(&event);
            groups[bucket].push(event);
        }
        groups
    }
}

impl<H> fmt::Debug for HashSlicer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashSlicer")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Lets each filter, in order, claim the still-unclaimed events it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSlicer {
    filters: Vec<Filter>,
}

impl FilterSlicer {
    /// Creates a slicer from filters in priority order.
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Returns the filters.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Parses concatenated serialized filters, e.g. `0(def)1(ABC)`.
    ///
    /// Filters are cut wherever the parenthesis depth returns to zero. The
    /// empty string is the empty slicer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for unbalanced parentheses,
    /// trailing text or an invalid filter.
    pub fn from_serialized(serialized: &str) -> CoreResult<Self> {
        let mut filters = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;

        for (i, c) in serialized.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        CoreError::invalid_input(format!(
                            "unbalanced ')' at {i} in filters {serialized:?}"
                        ))
                    })?;
                    if depth == 0 {
                        let end = i + c.len_utf8();
                        filters.push(Filter::from_serialized(&serialized[start..end])?);
                        start = end;
                    }
                }
                _ => {}
            }
        }

        if start != serialized.len() {
            return Err(CoreError::invalid_input(format!(
                "trailing text {:?} in filters {serialized:?}",
                &serialized[start..]
            )));
        }

        trace!(filters = filters.len(), "Parsed filter slicer");
        Ok(Self { filters })
    }
}

impl Slicer for FilterSlicer {
    fn size(&self) -> usize {
        self.filters.len() + 1
    }

    fn group_events(&self, events: Vec<Event>) -> Vec<Vec<Event>> {
        let mut groups = Vec::with_capacity(self.size());
        let mut pool = events;
        for filter in &self.filters {
            let (claimed, rest): (Vec<Event>, Vec<Event>) =
                pool.into_iter().partition(|event| filter.test(event));
            groups.push(claimed);
            pool = rest;
        }
        groups.push(pool);
        groups
    }
}

impl fmt::Display for FilterSlicer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for filter in &self.filters {
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

impl FromStr for FilterSlicer {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_serialized(s)
    }
}
