//! Logging setup shared by the server and the CLI.
//!
//! All output goes to stderr so `list --json` keeps stdout machine-readable.
//!
//! ```ignore
//! use vencord_installer_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::server())?;
//! ```

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Filter target covering every crate in the workspace.
const TARGET_PREFIX: &str = "vencord_installer";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for reading in a terminal.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// JSON lines.
    Json,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for workspace crates when no filter is given.
    pub level: Level,
    /// How each line is rendered.
    pub format: TracingOutputFormat,
    /// Print source file and line.
    pub location: bool,
    /// Print the module path of each event.
    pub target: bool,
    /// Prefix each line with the time.
    pub timestamps: bool,
    /// Emit an event when a span closes, which carries its recorded fields
    /// (e.g. `duration_ms` of a dispatched request).
    pub span_close: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::server()
    }
}

impl TracingConfig {
    /// The long-running server: info level, timestamps, targets.
    #[must_use]
    pub fn server() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Compact,
            location: false,
            target: true,
            timestamps: true,
            span_close: false,
            directive: None,
        }
    }

    /// One-shot commands: warnings only, bare lines.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            level: Level::WARN,
            target: false,
            timestamps: false,
            ..Self::server()
        }
    }

    /// `--debug`: everything from the workspace, with locations and span
    /// timings.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            location: true,
            span_close: true,
            ..Self::server()
        }
    }

    /// Sets the fallback level for workspace crates.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Uses `directive` as the filter, ignoring `RUST_LOG`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// Filter used when neither `directive` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{}={}", TARGET_PREFIX, self.level)
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.directive {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let span_events = if self.span_close {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.location)
            .with_line_number(self.location)
            .with_target(self.target)
            .with_span_events(span_events);

        match (self.format, self.timestamps) {
            (TracingOutputFormat::Json, _) => base.json().boxed(),
            (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// Fails if a subscriber is already installed or the directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.filter()?)
        .with(config.layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let server = TracingConfig::server();
        assert_eq!(server.level, Level::INFO);
        assert_eq!(server.format, TracingOutputFormat::Compact);
        assert!(server.timestamps);
        assert!(server.directive.is_none());

        let cli = TracingConfig::cli();
        assert_eq!(cli.level, Level::WARN);
        assert!(!cli.timestamps);
        assert!(!cli.target);

        let debug = TracingConfig::debug();
        assert_eq!(debug.level, Level::DEBUG);
        assert!(debug.location);
        assert!(debug.span_close);
    }

    #[test]
    fn default_directive_targets_workspace() {
        let config = TracingConfig::cli().with_level(Level::TRACE);
        assert_eq!(config.default_directive(), "vencord_installer=TRACE");
    }

    #[test]
    fn explicit_directive_wins() {
        let config = TracingConfig::server()
            .with_format(TracingOutputFormat::Json)
            .with_directive("vencord_installer_server=trace");
        assert_eq!(config.format, TracingOutputFormat::Json);
        assert!(config.filter().is_ok());

        let bad = TracingConfig::server().with_directive("vencord_installer=loud");
        assert!(matches!(bad.filter(), Err(TracingError::EnvFilter(_))));
    }
}
