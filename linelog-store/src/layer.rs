//! `tracing` layer that records events into a [`LogStore`].

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::record::{Fields, Level};
use crate::store::{holding_sink, LogStore};

/// Forwards every `tracing` event to [`LogStore::emit`].
///
/// Events raised while the store's sink lock is held on the same thread
/// (the store's own diagnostics) are not forwarded back into it.
#[derive(Debug, Clone)]
pub struct LogStoreLayer {
    store: Arc<LogStore>,
}

impl LogStoreLayer {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }
}

impl<S: Subscriber> Layer<S> for LogStoreLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if holding_sink() {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let level = Level::from(event.metadata().level());
        self.store.emit(level, &visitor.message, &visitor.fields);
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Fields,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}
