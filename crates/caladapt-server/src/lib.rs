//! Request handling for the calendar adapter service.
//!
//! This crate sits between a web router and the adapt pipeline:
//! - query-string parsing for the adapt and merge routes
//! - a content-hash cache for the picker configuration
//! - loading and merging the calendars selected by a bit mask
//!
//! # Example
//!
//! ```rust,no_run
//! use caladapt_server::{RequestHandler, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     config.init_tracing()?;
//!     let handler = RequestHandler::from_config(&config)?;
//!
//!     let adapted = handler.adapt("id=ri6Y7XYQ5Q5Z6Q&f=0(Tentamen)&fg=1").await?;
//!     let merged = handler.merge("5", "origin=false").await?;
//!     println!("{adapted}\n{merged}");
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod handler;
mod query;
mod source;

pub use cache::{ConfigCache, content_hash};
pub use config::{PickerCalendar, PickerConfig, ServerConfig, UNSELECTABLE_ID};
pub use error::{ServerError, ServerResult};
pub use handler::{RequestHandler, SharedPickerCache, new_picker_cache};
pub use query::{AdaptQuery, MergeQuery, QueryParams};
pub use source::{CalendarSource, DirectorySource};
