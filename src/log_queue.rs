//! Batched delivery of log lines to a rate-limited sink
//!
//! Producers call [`LogQueue::enqueue`] from anywhere, including tracing
//! callbacks on threads outside the runtime. A single drain task groups lines
//! into batches, splits oversized batches into chunks and pauses between
//! sends. Delivery is at-most-once: a batch the sink refuses is dropped, and
//! lines arriving while the queue is full are dropped and counted.

mod chunk;
mod layer;
mod sink;

pub use chunk::split_chunks;
pub use layer::SinkLayer;
pub use sink::{LogSink, SinkError, WebhookSink};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Target for the queue's own diagnostics; `SinkLayer` never forwards it
pub const LOCAL_TARGET: &str = "forgelegion::log_queue::local";

/// Batching and pacing knobs
#[derive(Debug, Clone)]
pub struct LogQueueConfig {
    /// Most lines waiting for delivery; further lines are dropped
    pub capacity: usize,
    /// Most lines per batch
    pub batch_size: usize,
    /// Wait for the first line of a batch before re-checking shutdown
    pub idle_timeout: Duration,
    /// Wait for each further line of a batch
    pub item_timeout: Duration,
    /// Longest message the sink is sent
    pub chunk_limit: usize,
    /// Pause between chunks of one batch
    pub chunk_delay: Duration,
    /// Pause after a delivered batch
    pub cool_off: Duration,
    /// Pause after a failed batch
    pub failure_backoff: Duration,
}

impl Default for LogQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            batch_size: 5,
            idle_timeout: Duration::from_secs(5),
            item_timeout: Duration::from_millis(500),
            chunk_limit: 1900,
            chunk_delay: Duration::from_secs(1),
            cool_off: Duration::from_secs(2),
            failure_backoff: Duration::from_secs(5),
        }
    }
}

/// Cloneable handle to the queue
#[derive(Clone)]
pub struct LogQueue {
    inner: Arc<Inner>,
}

struct Inner {
    tx: mpsc::Sender<String>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    /// Lines dropped on overflow since the drain last reported them
    dropped: Arc<AtomicU64>,
    sink: Arc<dyn LogSink>,
    config: LogQueueConfig,
    runtime: Handle,
    drainer: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl LogQueue {
    /// Create a queue bound to the current tokio runtime.
    ///
    /// Must be called from within a runtime; `enqueue` may be called from
    /// anywhere afterwards.
    pub fn new(
        sink: Arc<dyn LogSink>,
        config: LogQueueConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
                dropped: Arc::new(AtomicU64::new(0)),
                sink,
                config,
                runtime: Handle::current(),
                drainer: Mutex::new(None),
                shutdown,
            }),
        }
    }

    /// Queue a line for delivery. Never blocks; a full queue drops the line.
    pub fn enqueue(&self, line: impl Into<String>) {
        match self.inner.tx.try_send(line.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Closed(_)) => return,
        }
        self.ensure_drainer();
    }

    /// Spawn the drain task unless one is alive
    fn ensure_drainer(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        let mut slot = self
            .inner
            .drainer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let drain = Drain {
            rx: self.inner.rx.clone(),
            dropped: self.inner.dropped.clone(),
            sink: self.inner.sink.clone(),
            config: self.inner.config.clone(),
            shutdown: self.inner.shutdown.clone(),
        };
        *slot = Some(self.inner.runtime.spawn(drain.run()));
    }

    /// Whether a drain task is currently running
    #[cfg(test)]
    pub fn is_draining(&self) -> bool {
        self.inner
            .drainer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// The single consumer of the queue
struct Drain {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    dropped: Arc<AtomicU64>,
    sink: Arc<dyn LogSink>,
    config: LogQueueConfig,
    shutdown: CancellationToken,
}

impl Drain {
    async fn run(self) {
        let mut rx = self.rx.lock().await;

        while !self.shutdown.is_cancelled() {
            let first = tokio::select! {
                () = self.shutdown.cancelled() => break,
                next = timeout(self.config.idle_timeout, rx.recv()) => next,
            };
            let first = match first {
                Ok(Some(line)) => line,
                Ok(None) => break,
                // Idle: loop around and re-check shutdown
                Err(_) => continue,
            };

            let mut batch = vec![first];
            while batch.len() < self.config.batch_size {
                match timeout(self.config.item_timeout, rx.recv()).await {
                    Ok(Some(line)) => batch.push(line),
                    _ => break,
                }
            }

            self.report_dropped();
            let pause = match self.deliver(&batch).await {
                Ok(()) => self.config.cool_off,
                Err(e) => {
                    tracing::error!(
                        target: LOCAL_TARGET,
                        error = %e,
                        dropped = batch.len(),
                        "Failed to deliver log batch"
                    );
                    self.config.failure_backoff
                }
            };

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = sleep(pause) => {}
            }
        }
    }

    fn report_dropped(&self) {
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!(target: LOCAL_TARGET, dropped, "Log queue full, lines dropped");
        }
    }

    async fn deliver(&self, batch: &[String]) -> Result<(), SinkError> {
        let text = batch.join("\n");
        let chunks = split_chunks(&text, self.config.chunk_limit);
        // The sink refuses blank messages
        let sendable = chunks.iter().filter(|chunk| !chunk.trim().is_empty());
        for (i, chunk) in sendable.enumerate() {
            if i > 0 {
                sleep(self.config.chunk_delay).await;
            }
            self.sink.send(chunk).await?;
        }
        Ok(())
    }
}
