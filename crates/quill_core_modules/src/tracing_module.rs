//! Logging setup.
//!
//! [`TracingModule`] installs a `tracing` subscriber once the catalog has
//! loaded. It declares no hooks.
//!
//! # Example
//!
//! ```
//! use quill_core_modules::{TracingFormat, TracingModule};
//! use quill_modules::BehaviorCatalog;
//! use tracing::Level;
//!
//! let mut catalog = BehaviorCatalog::new();
//! catalog.add_modules(
//!     TracingModule::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact)
//!         .with_env_filter("quill=debug"),
//! );
//! let engine = catalog.finalize_loading().unwrap();
//! assert!(engine.has_module("tracing"));
//! ```

use quill_hooks::Tier;
use quill_modules::{BehaviorEngine, BehaviorModule, ModuleLoader};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line, human readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The settings a [`TracingModule`] installs its subscriber with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default maximum level.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Filter directives, overriding `level` when they parse.
    pub env_filter: Option<String>,
    /// Log span enter and exit.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// The filter the subscriber is installed with. Directives that fail to
    /// parse fall back to `level`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = tracing_subscriber::fmt::layer().with_span_events(self.span_events());
        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingModule
// ─────────────────────────────────────────────────────────────────────────────

/// Installs the global `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingModule {
    config: TracingConfig,
}

impl TracingModule {
    /// Creates a module with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default maximum level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Sets filter directives such as `quill::dispatch=trace,info`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.config.span_events = enabled;
        self
    }

    /// The settings this module installs.
    #[must_use]
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Installs the subscriber now. Returns false if a global subscriber
    /// was already set, in which case that one stays in place.
    pub fn install(&self) -> bool {
        tracing_subscriber::registry()
            .with(self.config.fmt_layer())
            .with(self.config.filter())
            .try_init()
            .is_ok()
    }
}

impl BehaviorModule for TracingModule {
    fn name(&self) -> &str {
        "tracing"
    }

    fn tier(&self) -> Tier {
        Tier::CORE
    }

    fn build(&self, _loader: &mut ModuleLoader<'_>) {}

    fn ready(&self, engine: &BehaviorEngine) {
        let installed = self.install();
        tracing::info!(
            level = %self.config.level,
            format = ?self.config.format,
            installed,
            modules = engine.modules().count(),
            "tracing initialized"
        );
    }
}
