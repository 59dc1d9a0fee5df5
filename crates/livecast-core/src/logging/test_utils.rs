//! Log capture for tests that assert on emitted lines.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One log line as emitted.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// The `message` field.
    pub message: String,
    /// Every other field, in emission order.
    pub fields: Vec<(&'static str, String)>,
}

impl CapturedEvent {
    /// Value of the named field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find_map(|(k, v)| (*k == name).then_some(v.as_str()))
    }
}

/// Lines captured since [`capture_logs`] was called.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    /// Every line, oldest first.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().clone()
    }

    /// Whether a line at `level` contains `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.0
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = CapturedEvent {
            level: *event.metadata().level(),
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut line);
        self.0.lock().push(line);
    }
}

impl Visit for CapturedEvent {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push((field.name(), value.to_owned()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

/// Capture every event on the current thread until the guard drops.
///
/// Thread-local, so pair it with the current-thread test runtime.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(logs.clone())
        .set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_level_message_and_fields() {
        let (logs, _guard) = capture_logs();
        tracing::info!(count = 7_i64, user = "ann", "viewers");
        tracing::warn!("dropping frame");

        assert!(logs.has_event(Level::INFO, "viewers"));
        assert!(logs.has_event(Level::WARN, "dropping"));
        assert!(!logs.has_event(Level::ERROR, "dropping"));

        let events = logs.events();
        assert_eq!(events[0].field("count"), Some("7"));
        assert_eq!(events[0].field("user"), Some("ann"));
        assert_eq!(events[0].field("missing"), None);
    }

    #[test]
    fn nothing_captured_after_guard_drops() {
        let (logs, guard) = capture_logs();
        tracing::debug!("kept");
        drop(guard);
        tracing::debug!("lost");
        assert_eq!(logs.events().len(), 1);
    }
}
