//! Log output setup shared by the caladapt crates.
//!
//! ```ignore
//! use caladapt_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(&TracingConfig::service())?;
//! ```
//!
//! With [`TracingConfig::service`] every request span (`adapt`, `merge`,
//! `groups` in the server crate) is logged once when it closes, carrying its
//! fields and its busy/idle time.

use std::io;

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Log target prefix shared by every caladapt crate.
pub const LOG_TARGET: &str = "caladapt";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter directive: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event, for log collectors.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `caladapt*` targets when `RUST_LOG` is unset.
    pub level: Level,
    pub format: TracingOutputFormat,
    pub timestamps: bool,
    /// Log each span once when it closes.
    pub request_spans: bool,
    pub ansi: bool,
    /// Full filter directive; overrides both `RUST_LOG` and `level`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Pretty,
            timestamps: true,
            request_spans: false,
            ansi: true,
            directive: None,
        }
    }
}

impl TracingConfig {
    /// Debug-level single-line output without timestamps, for local runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: TracingOutputFormat::Compact,
            timestamps: false,
            ..Self::default()
        }
    }

    /// JSON output with one record per finished request.
    #[must_use]
    pub fn service() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            request_spans: true,
            ansi: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Sets a full filter directive, e.g. `caladapt_providers=trace,info`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }
}

/// Installs the global subscriber, writing to stdout. Call once, at startup.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the configured directive
/// is invalid.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(build_filter(config)?)
        .with(fmt_layer(config, io::stdout));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Builds the formatting layer for `config`, writing to `writer`.
pub fn fmt_layer<S, W>(config: &TracingConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.request_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(config.ansi)
        .with_span_events(span_events);

    match (config.format, config.timestamps) {
        (TracingOutputFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingOutputFormat::Json, true) => layer.json().boxed(),
        (TracingOutputFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

fn build_filter(config: &TracingConfig) -> Result<EnvFilter, TracingError> {
    if let Some(ref directive) = config.directive {
        return Ok(EnvFilter::try_new(directive)?);
    }
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.level))))
}

/// Directive enabling `level` for every caladapt crate.
///
/// Crate targets use underscores (`caladapt_core`), so the bare prefix
/// matches all of them.
fn default_directive(level: Level) -> String {
    format!("{LOG_TARGET}={level}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn render(config: &TracingConfig) -> String {
        let config = TracingConfig {
            ansi: false,
            ..config.clone()
        };
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = Registry::default().with(fmt_layer(&config, move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("adapt", id = "ri123");
            span.in_scope(|| tracing::info!(events = 3, "Adapted calendar"));
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn timestamps_follow_the_config_in_every_format() {
        let timestamp = Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}").unwrap();
        for format in [
            TracingOutputFormat::Pretty,
            TracingOutputFormat::Compact,
            TracingOutputFormat::Json,
        ] {
            let config = TracingConfig::default().with_format(format);
            let with_time = render(&config.clone().with_timestamps(true));
            let without_time = render(&config.with_timestamps(false));

            assert!(with_time.contains("Adapted calendar"), "{format:?}");
            assert!(timestamp.is_match(&with_time), "{format:?}: {with_time}");
            assert!(!timestamp.is_match(&without_time), "{format:?}: {without_time}");
        }
    }

    #[test]
    fn service_preset_logs_closed_request_spans() {
        let output = render(&TracingConfig::service());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2, "{output}");
        assert!(lines[0].contains("\"events\":3"));
        assert!(lines[1].contains("close"), "{}", lines[1]);
        assert!(lines[1].contains("ri123"));
    }

    #[test]
    fn presets() {
        let dev = TracingConfig::development();
        assert_eq!(dev.level, Level::DEBUG);
        assert_eq!(dev.format, TracingOutputFormat::Compact);
        assert!(!dev.timestamps);

        let service = TracingConfig::service();
        assert_eq!(service.format, TracingOutputFormat::Json);
        assert!(service.request_spans);
        assert!(!service.ansi);
    }

    #[test]
    fn default_directive_covers_all_crates() {
        assert_eq!(default_directive(Level::DEBUG), "caladapt=DEBUG");
        assert!(EnvFilter::try_new(default_directive(Level::WARN)).is_ok());
    }

    #[test]
    fn explicit_directive_wins() {
        let config = TracingConfig::default()
            .with_level(Level::WARN)
            .with_directive("caladapt_providers=trace");
        assert!(build_filter(&config).is_ok());

        let invalid = TracingConfig::default().with_directive("caladapt=loud");
        assert!(matches!(
            build_filter(&invalid),
            Err(TracingError::EnvFilter(_))
        ));
        assert!(matches!(
            init_tracing(&invalid),
            Err(TracingError::EnvFilter(_))
        ));
    }
}
