//! Calendar model and the event-rewriting pipeline: text extraction,
//! formatting, filters, slicers, property grouping, merging and bit-mask
//! selection.

pub mod bitmask;
pub mod calendar;
pub mod error;
pub mod event_data;
pub mod filter;
pub mod format;
pub mod grouping;
pub mod merge;
pub mod slicer;
pub mod tracing;

pub use calendar::{Calendar, Event, PropertyValue};
pub use error::{CoreError, CoreResult};
pub use event_data::EventData;
pub use filter::{Filter, FilterMode};
pub use format::{format_event, format_location, format_summary};
pub use grouping::{GROUPABLE_PROPERTIES, PropertyGroupSelection};
pub use merge::merge;
pub use slicer::{FilterSlicer, HashSlicer, Slicer};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
