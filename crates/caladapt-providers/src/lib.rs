//! Calendar providers and the adapt pipeline.
//!
//! - [`CalendarProvider`] - how a calendar source addresses and rewrites its feeds
//! - [`TimeEditProvider`] - TimeEdit public schedules
//! - [`Fetcher`] / [`HttpFetcher`] - the single outbound GET per request
//! - [`Adapter`] - fetch, validate, parse, narrow, rewrite
//! - [`ProviderError`] - error types for all of the above
//!
//! # Architecture
//!
//! ```text
//!  id ──▶ CalendarProvider::create_url ──▶ Fetcher (spawned, raced
//!                                          against the timeout)
//!                                               │
//!                                               ▼
//!                              status / content-type check, parse
//!                                               │
//!                                               ▼
//!                  PropertyGroupSelection (raw text, optional)
//!                                               │
//!                                               ▼
//!                           CalendarProvider::convert_calendar
//!                                               │
//!                                               ▼
//!                  FilterSlicer group (formatted text, optional)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use caladapt_providers::{AdaptOptions, Adapter, TimeEditConfig};
//!
//! let adapter = Adapter::timeedit(TimeEditConfig::with_default_base()?)?;
//! let calendar = adapter.adapt("ri6Y7XYQ5Q5Z6Q", &AdaptOptions::new()).await?;
//! println!("{}", calendar.serialize());
//! ```

pub mod adapter;
pub mod error;
pub mod fetch;
pub mod provider;
pub mod timeedit;

pub use adapter::{AdaptOptions, Adapter, FilterSelection};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use provider::{BoxFuture, CalendarProvider, ProviderExtra};
pub use timeedit::{TimeEditConfig, TimeEditProvider};
