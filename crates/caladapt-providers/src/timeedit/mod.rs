//! TimeEdit provider.
//!
//! TimeEdit publishes schedules as `<base>/<id>.ics` feeds, with an HTML
//! view at `<base>/<id>.html`. Exports pack course, activity and room data
//! into the summary and location fields; the provider rewrites them with
//! [`caladapt_core::format`].

mod config;
mod provider;

pub use config::TimeEditConfig;
pub use provider::TimeEditProvider;
