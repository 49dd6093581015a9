use super::Core;
use crate::domain::{Field, Level, LogEntry};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field as TracingField, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Targets whose events never enter the pipeline: the transport's own
/// diagnostics would otherwise be shipped by the transport itself.
const DEFAULT_EXCLUDED_TARGETS: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
];

/// `tracing` layer feeding every event into a pipeline [`Core`].
///
/// The event target becomes the logger name, the `message` field the
/// message, and every other recorded field a typed [`Field`].
pub struct ForwardingLayer {
    core: Arc<dyn Core>,
    excluded_targets: Vec<String>,
}

impl ForwardingLayer {
    pub fn new(core: impl Core + 'static) -> Self {
        Self::from_shared(Arc::new(core))
    }

    pub fn from_shared(core: Arc<dyn Core>) -> Self {
        Self {
            core,
            excluded_targets: DEFAULT_EXCLUDED_TARGETS.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    pub fn with_excluded_target(mut self, target: impl Into<String>) -> Self {
        self.excluded_targets.push(target.into());
        self
    }

    fn is_excluded(&self, target: &str) -> bool {
        self.excluded_targets.iter().any(|excluded| {
            target == excluded
                || target
                    .strip_prefix(excluded.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

impl<S: Subscriber> Layer<S> for ForwardingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_excluded(metadata.target()) {
            return;
        }

        let level = Level::from(metadata.level());
        if !self.core.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry::new(level, metadata.target(), visitor.message);
        if let Err(e) = self.core.write(&entry, &visitor.fields) {
            // No logger to report to from inside the logger
            eprintln!("cloudwatch-hook: failed to forward event: {e}");
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<Field>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(Field::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.push(Field::i64(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.push(Field::u64(field.name(), value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.push(Field::bool(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.fields.push(Field::f64(field.name(), value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.fields.push(Field::error(field.name(), value));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(Field::string(field.name(), format!("{value:?}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;
    use parking_lot::Mutex;
    use tracing_subscriber::prelude::*;

    #[derive(Default)]
    struct Capture {
        entries: Mutex<Vec<(LogEntry, Vec<Field>)>>,
    }

    impl Core for Capture {
        fn enabled(&self, level: Level) -> bool {
            level >= Level::Info
        }

        fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
            self.entries.lock().push((entry.clone(), fields.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_events_become_entries_with_typed_fields() {
        let capture = Arc::new(Capture::default());
        let subscriber =
            tracing_subscriber::registry().with(ForwardingLayer::from_shared(capture.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "svc", count = 3, ok = true, user = "alice", "start");
            tracing::debug!(target: "svc", "too verbose");
            tracing::warn!(target: "reqwest::connect", "transport noise");
        });

        let entries = capture.entries.lock();
        assert_eq!(entries.len(), 1);
        let (entry, fields) = &entries[0];
        assert_eq!(entry.level, Level::Info);
        assert_eq!(entry.logger_name, "svc");
        assert_eq!(entry.message, "start");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].key, "count");
        assert_eq!(fields[0].integer, 3);
        assert_eq!(fields[1].integer, 1);
        assert_eq!(fields[2].string, "alice");
    }

    #[test]
    fn test_excluded_target_matching() {
        let layer = ForwardingLayer::new(Capture::default()).with_excluded_target("noisy");
        assert!(layer.is_excluded("hyper"));
        assert!(layer.is_excluded("hyper::proto::h1"));
        assert!(layer.is_excluded("noisy"));
        assert!(!layer.is_excluded("hyperion"));
        assert!(!layer.is_excluded("svc"));
    }
}
