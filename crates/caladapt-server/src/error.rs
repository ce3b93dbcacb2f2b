//! Server error types.

use std::io;

use caladapt_core::{CoreError, TracingError};
use caladapt_providers::ProviderError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed or inconsistent query parameters.
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// A calendar name that could escape the calendar directory.
    #[error("Invalid calendar name: {name:?}")]
    InvalidCalendarName { name: String },

    /// Error from the event pipeline (filters, slicers, merging, parsing).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from fetching or adapting a provider calendar.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// IO error (calendar files, picker config).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The log subscriber could not be installed.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl ServerError {
    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an invalid calendar name error.
    pub fn invalid_calendar_name(name: impl Into<String>) -> Self {
        Self::InvalidCalendarName { name: name.into() }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the request, not the server or upstream, is at fault.
    ///
    /// A router maps these to `400 Bad Request` and everything else to a
    /// 5xx status.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidQuery { .. } | Self::InvalidCalendarName { .. } => true,
            Self::Core(err) => err.is_invalid_input(),
            Self::Provider(err) => err.is_client_error(),
            Self::Io(_) | Self::Config { .. } | Self::Tracing(_) => false,
        }
    }
}
