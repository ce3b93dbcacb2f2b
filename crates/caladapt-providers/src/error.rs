//! Error types for fetching and adapting provider calendars.

use std::fmt;

use caladapt_core::CoreError;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The caller supplied a malformed id, URL or slicing parameter.
    InvalidInput,
    /// The upstream did not answer within the fetch timeout.
    Timeout,
    /// The upstream answered with a non-success status.
    UpstreamStatus,
    /// The upstream answered with something other than a calendar.
    ContentType,
    /// The body is not a valid calendar.
    Parse,
    /// Connection, DNS or body transfer failure.
    Network,
    /// Unexpected state, e.g. a fetch task that panicked.
    Internal,
}

impl ProviderErrorCode {
    /// Returns true if the caller, not the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput)
    }

    /// Returns true if the upstream could not be reached or answered badly.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::UpstreamStatus | Self::ContentType | Self::Network
        )
    }

    /// Returns the snake_case name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Timeout => "provider_timeout",
            Self::UpstreamStatus => "upstream_status",
            Self::ContentType => "content_type",
            Self::Parse => "parse_error",
            Self::Network => "network_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while fetching, validating or converting a calendar.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Provider that raised the error (e.g. "timeedit").
    provider: Option<String>,
    /// Upstream HTTP status, for [`ProviderErrorCode::UpstreamStatus`].
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates an error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            source: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidInput, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    /// Creates an error for a non-success upstream status.
    pub fn upstream_status(status: u16, url: &str) -> Self {
        let mut err = Self::new(
            ProviderErrorCode::UpstreamStatus,
            format!("{url} answered with status {status}"),
        );
        err.status = Some(status);
        err
    }

    /// Creates an error for a response that is not a calendar.
    pub fn content_type(content_type: Option<&str>, url: &str) -> Self {
        Self::new(
            ProviderErrorCode::ContentType,
            format!(
                "{url} answered with content type {:?}, expected a calendar",
                content_type.unwrap_or("<none>")
            ),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Parse, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Network, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    /// Sets the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns the upstream HTTP status, if the upstream answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if the caller, not the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        self.code.is_client_error()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<CoreError> for ProviderError {
    fn from(err: CoreError) -> Self {
        let code = match err {
            CoreError::InvalidInput { .. } => ProviderErrorCode::InvalidInput,
            CoreError::Parse { .. } => ProviderErrorCode::Parse,
        };
        Self::new(code, err.to_string()).with_source(err)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
