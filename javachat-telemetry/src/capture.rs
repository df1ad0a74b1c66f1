//! In-memory capture of tracing events.
//!
//! [`CaptureLayer`] records every event it sees into a shared
//! [`EventCapture`], so tests can assert that a degraded path logged the
//! warning it promises without scraping stderr.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layered, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

/// Field holding the event's message.
const MESSAGE_FIELD: &str = "message";

/// One recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, serde_json::Value>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

/// Shared storage written by [`CaptureLayer`].
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer writing into this capture.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { capture: self.clone() }
    }

    /// A standalone subscriber that only captures.
    ///
    /// Install it for one test with `tracing::subscriber::set_default`.
    pub fn subscriber(&self) -> Layered<CaptureLayer, Registry> {
        Registry::default().with(self.layer())
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// Recorded events at `level`.
    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        let level = level.to_string();
        self.events().into_iter().filter(|e| e.level == level).collect()
    }

    /// True if any event's message contains `needle`.
    pub fn contains_message(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// A tracing layer that stores events in an [`EventCapture`].
pub struct CaptureLayer {
    capture: EventCapture,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;
        let message = match fields.remove(MESSAGE_FIELD) {
            Some(serde_json::Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let metadata = event.metadata();
        self.capture.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use tracing::{info, warn};

    use super::*;

    #[test]
    fn records_level_message_and_fields() {
        let capture = EventCapture::new();
        tracing::subscriber::with_default(capture.subscriber(), || {
            info!(collection = "java-docs", count = 3u64, "upserted documents");
            warn!(error = %"connection reset", "transient failure, retrying");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "upserted documents");
        assert_eq!(events[0].field("collection"), Some(&serde_json::json!("java-docs")));
        assert_eq!(events[0].field("count"), Some(&serde_json::json!(3)));
        assert_eq!(capture.events_at(Level::WARN).len(), 1);
        assert_eq!(capture.events_at(Level::WARN)[0].field("error"), Some(&serde_json::json!("connection reset")));
        assert!(capture.contains_message("retrying"));

        capture.clear();
        assert!(capture.events().is_empty());
    }

    #[tokio::test]
    async fn scoped_default_covers_async_code() {
        let capture = EventCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        async { warn!("degraded") }.await;
        assert!(capture.contains_message("degraded"));
    }
}
