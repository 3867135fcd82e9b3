//! Structured logging setup using the tracing crate.
//!
//! The library only emits events. Applications that want them printed call
//! [`LoggingBuilder::init`] once, or compose [`LoggingBuilder::build_layer`]
//! into their own subscriber.

use crate::config::{LogFormat, LogLevel, LoggingConfig};
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Builder for constructing a logging layer.
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    /// Create a new logging builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::default(),
        }
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    /// Log span open/close events.
    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.config.with_spans = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.config.with_target = enabled;
        self
    }

    /// Set filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    /// Build and install the global subscriber.
    pub fn init(self) -> crate::error::Result<()> {
        tracing_subscriber::registry()
            .with(self.build_layer::<Registry>())
            .try_init()
            .map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Build a logging layer that can be composed with other layers.
    pub fn build_layer<S>(self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
    {
        let env_filter = self.build_filter();
        let span_events = self.span_events();

        match self.config.format {
            LogFormat::Pretty => Box::new(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(self.config.ansi_colors)
                    .with_target(self.config.with_target)
                    .with_span_events(span_events)
                    .with_filter(env_filter),
            ),
            LogFormat::Compact => Box::new(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(self.config.ansi_colors)
                    .with_target(self.config.with_target)
                    .with_span_events(span_events)
                    .with_filter(env_filter),
            ),
            LogFormat::Json => Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(self.config.with_spans)
                    .with_span_list(self.config.with_spans)
                    .with_target(self.config.with_target)
                    .with_span_events(span_events)
                    .with_filter(env_filter),
            ),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.config.with_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// `RUST_LOG` wins, then the configured directive, then the level.
    fn build_filter(&self) -> EnvFilter {
        let default_filter = self.config.level.as_str();

        if let Some(ref filter) = self.config.filter {
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new(default_filter))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
        }
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
