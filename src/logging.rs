//! Process-wide `tracing` subscriber setup.

use crate::domain::Level;
use crate::pipeline::{Core, ForwardingLayer};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Transport crates kept at `warn` unless `RUST_LOG` says otherwise.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {details}")]
    InvalidFilter { filter: String, details: String },
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub fn tracing_level(level: Level) -> tracing::Level {
    match level {
        Level::Debug => tracing::Level::DEBUG,
        Level::Info => tracing::Level::INFO,
        Level::Warn => tracing::Level::WARN,
        Level::Error | Level::Fatal | Level::Panic => tracing::Level::ERROR,
    }
}

/// `RUST_LOG` wins when set; otherwise `level` with the transport crates
/// quietened.
pub fn build_filter_string(level: Level) -> String {
    let mut parts = Vec::with_capacity(QUIET_TARGETS.len() + 1);
    // EnvFilter only knows the tracing levels; fatal and panic fold into error
    parts.push(tracing_level(level).as_str().to_ascii_lowercase());
    for target in QUIET_TARGETS {
        parts.push(format!("{target}=warn"));
    }
    parts.join(",")
}

fn env_filter(level: Level) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let filter = build_filter_string(level);
    EnvFilter::try_new(&filter).map_err(|e| LoggingError::InvalidFilter {
        filter,
        details: e.to_string(),
    })
}

/// Installs a compact console subscriber. Fails if one is already set.
pub fn setup_logging(level: Level) -> Result<(), LoggingError> {
    let console = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact()
        .with_filter(env_filter(level)?);

    tracing_subscriber::registry()
        .with(console)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Like [`setup_logging`], and also routes every event at or above `level`
/// into `core`. The console filter does not apply to the forwarded events.
pub fn setup_forwarding(level: Level, core: Arc<dyn Core>) -> Result<(), LoggingError> {
    let console = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact()
        .with_filter(env_filter(level)?);

    let forwarding = ForwardingLayer::from_shared(core).with_filter(
        tracing_subscriber::filter::LevelFilter::from_level(tracing_level(level)),
    );

    tracing_subscriber::registry()
        .with(console)
        .with(forwarding)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string_quiets_transport() {
        let filter = build_filter_string(Level::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn test_severe_levels_filter_at_error() {
        for level in [Level::Fatal, Level::Panic] {
            let filter = build_filter_string(level);
            assert!(filter.starts_with("error,"), "{filter}");
            assert!(!filter.contains("fatal") && !filter.contains("panic"));
        }
        assert!(build_filter_string(Level::Warn).starts_with("warn,"));
    }

    #[test]
    fn test_fatal_filter_passes_error_events() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tracing_subscriber::Layer;

        struct Counter(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> Layer<S> for Counter {
            fn on_event(
                &self,
                _event: &tracing::Event<'_>,
                _ctx: tracing_subscriber::layer::Context<'_, S>,
            ) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let seen = Arc::new(AtomicUsize::new(0));
        let filter = EnvFilter::try_new(build_filter_string(Level::Fatal)).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(Counter(Arc::clone(&seen)).with_filter(filter));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "svc", "kept");
            tracing::warn!(target: "svc", "dropped");
            tracing::trace!(target: "fatal", "dropped");
        });

        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_severe_levels_map_to_error() {
        assert_eq!(tracing_level(Level::Fatal), tracing::Level::ERROR);
        assert_eq!(tracing_level(Level::Panic), tracing::Level::ERROR);
        assert_eq!(tracing_level(Level::Warn), tracing::Level::WARN);
    }
}
