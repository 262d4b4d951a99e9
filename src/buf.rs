use std::time::Duration;

use crate::{codec::encode_event, exporter::PushClient, now, MetricEvent, PushConfig, Time, Value};

type ErrorHandler = Box<dyn FnMut(&anyhow::Error) + Send>;

/// Collects formatted metric lines and hands them to a [`PushClient`].
///
/// Delivery is best effort: [`flush`](Self::flush) and [`remove`](Self::remove)
/// never fail. Client errors go to the handler set with
/// [`on_error`](Self::on_error), which discards them unless replaced.
pub struct MetricsBuffer<C> {
    client: C,
    config: PushConfig,
    lines: Vec<String>,
    on_error: ErrorHandler,
}
impl<C: PushClient> MetricsBuffer<C> {
    pub fn new(client: C, config: PushConfig) -> Self {
        Self {
            client,
            config,
            lines: vec![],
            on_error: Box::new(|_| {}),
        }
    }

    pub fn on_error(mut self, handler: impl FnMut(&anyhow::Error) + Send + 'static) -> Self {
        self.on_error = Box::new(handler);
        self
    }

    pub fn push(&mut self, event: MetricEvent) {
        self.lines.push(encode_event(&event, now));
    }

    /// Sets a counter to `value`.
    pub fn measure(&mut self, name: &str, value: impl Into<Value>) {
        self.push(MetricEvent::new(name, value));
    }
    pub fn measure_at(&mut self, name: &str, value: impl Into<Value>, time: Time) {
        self.push(MetricEvent::new(name, value).at(time));
    }
    pub fn increment(&mut self, name: &str) {
        self.measure(name, 1);
    }
    pub fn decrement(&mut self, name: &str) {
        self.measure(name, -1);
    }
    pub fn timing(&mut self, name: &str, elapsed: impl Into<Value>) {
        self.measure(name, elapsed);
    }
    /// Records `elapsed` in whole milliseconds.
    pub fn timing_duration(&mut self, name: &str, elapsed: Duration) {
        let millis = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self.measure(name, millis);
    }
    pub fn gauge(&mut self, name: &str, value: impl Into<Value>) {
        self.measure(name, value);
    }

    /// Sends every buffered line. Does nothing when the buffer is empty.
    pub fn flush(&mut self) {
        if let Err(e) = self.try_flush() {
            (self.on_error)(&e);
        }
    }
    pub fn try_flush(&mut self) -> anyhow::Result<()> {
        if self.lines.is_empty() {
            tracing::trace!("nothing to flush");
            return Ok(());
        }
        self.client
            .replace(&self.lines, self.config.job.as_deref(), &self.config.groups)?;
        if self.config.clear_on_flush {
            self.lines.clear();
        }
        Ok(())
    }

    /// Deletes the pushed group. Buffered lines are left alone.
    pub fn remove(&mut self) {
        if let Err(e) = self.try_remove() {
            (self.on_error)(&e);
        }
    }
    pub fn try_remove(&mut self) -> anyhow::Result<()> {
        self.client
            .delete(self.config.job.as_deref(), &self.config.groups)
    }
}
impl<C> MetricsBuffer<C> {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
    pub fn len(&self) -> usize {
        self.lines.len()
    }
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
    pub fn clear(&mut self) {
        self.lines.clear();
    }
    pub fn config(&self) -> &PushConfig {
        &self.config
    }
    pub fn client(&self) -> &C {
        &self.client
    }
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}
impl<C: core::fmt::Debug> core::fmt::Debug for MetricsBuffer<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MetricsBuffer")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("lines", &self.lines.len())
            .finish()
    }
}

/// Error handler that reports through `tracing`.
pub fn log_error(e: &anyhow::Error) {
    tracing::warn!("failed to push metrics: {e:#}");
}
