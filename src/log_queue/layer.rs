//! Tracing layer feeding the log queue

use super::{LogQueue, LOCAL_TARGET};
use std::fmt::Write as _;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Formats INFO-and-above events as
/// `<timestamp> - <target> - <LEVEL> - <message> key=value ...` and enqueues them
pub struct SinkLayer {
    queue: LogQueue,
}

impl SinkLayer {
    pub fn new(queue: LogQueue) -> Self {
        Self { queue }
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Failures of the queue itself are reported locally only
        if *metadata.level() > Level::INFO || metadata.target() == LOCAL_TARGET {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut line = format!(
            "{} - {} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            metadata.target(),
            metadata.level(),
            visitor.message
        );
        for (name, value) in &visitor.fields {
            let _ = write!(line, " {name}={value}");
        }

        self.queue.enqueue(line);
    }
}

/// Collects the message and the remaining fields in record order
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}
