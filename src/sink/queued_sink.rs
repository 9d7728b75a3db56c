use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use colored::*;
use tracing::{info, warn};

use super::sample_queue::SampleQueue;
use super::types::{AudioBuffer, ControlState, NextSample, Result, SinkError};
use crate::sink_debug;

/// Fixed bound on the end-of-stream drain wait
pub const END_OF_STREAM_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Downstream collaborator fed by the worker thread.
///
/// `process_sample` receives one buffer per call, in submission order. The
/// control hooks mirror the sink's own operations: the sink runs its queue
/// logic first, then calls through to the matching hook. Hooks take `&self`
/// because the worker thread and the producer thread hold the collaborator
/// concurrently; implementations use interior mutability for their state.
pub trait AudioSink: Send + Sync {
    /// Process one dequeued buffer. Errors are logged by the worker and the
    /// loop continues; a bad buffer must not kill the sink.
    fn process_sample(&self, buffer: Arc<AudioBuffer>) -> anyhow::Result<()>;

    /// Called by `start` before the worker thread is spawned. A failure here
    /// aborts the start with no thread left running.
    fn on_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called by `begin_stop` after the stop request is raised
    fn on_begin_stop(&self) {}

    /// Called by `end_stop` after the worker has been joined
    fn on_end_stop(&self) {}

    /// Called by `flush` after the queue has been discarded
    fn on_begin_flush(&self) {}

    /// Called by `end_of_stream` after the queue has drained (or the drain
    /// timeout lapsed)
    fn on_end_of_stream(&self) {}
}

/// Tunables for the sink's worker and control protocol
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Wait granularity of the worker loop. Stop requests wake the worker
    /// immediately through the queue condvar; this only bounds how often an
    /// otherwise idle worker re-checks its conditions.
    pub poll_interval: Duration,
    /// Bound on how long `end_stop` waits for the worker to exit
    pub end_stop_timeout: Duration,
    /// Bound on how long `end_of_stream` waits for the queue to drain
    pub eos_drain_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            end_stop_timeout: Duration::from_secs(2),
            eos_drain_timeout: END_OF_STREAM_DRAIN_TIMEOUT,
        }
    }
}

/// Queued audio sink: decouples a real-time producer from a downstream
/// collaborator via an unbounded FIFO and one dedicated worker thread.
///
/// The producer submits buffers and drives the control protocol; the worker
/// dequeues at its own pace and feeds `S::process_sample`. One worker exists
/// per `start` / `end_stop` cycle, never more.
pub struct QueuedSink<S: AudioSink + 'static> {
    queue: Arc<SampleQueue>,
    downstream: Arc<S>,
    config: SinkConfig,
    state: ControlState,
    worker: Option<JoinHandle<()>>,
}

impl<S: AudioSink + 'static> QueuedSink<S> {
    pub fn new(downstream: S) -> Self {
        Self::with_config(downstream, SinkConfig::default())
    }

    pub fn with_config(downstream: S, config: SinkConfig) -> Self {
        Self {
            queue: Arc::new(SampleQueue::new()),
            downstream: Arc::new(downstream),
            config,
            state: ControlState::Idle,
            worker: None,
        }
    }

    /// Spawn the worker thread and transition to `Running`.
    ///
    /// No-op returning success if a worker already exists. The downstream
    /// `on_start` hook runs before the spawn; if either fails, no thread is
    /// left running and `SinkError::Startup` is returned.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        self.downstream.on_start().map_err(SinkError::Startup)?;
        self.queue.reset_for_start();

        let queue = Arc::clone(&self.queue);
        let downstream = Arc::clone(&self.downstream);
        let poll_interval = self.config.poll_interval;
        let handle = thread::Builder::new()
            .name("queued-sink-worker".into())
            .spawn(move || worker_loop(queue, downstream, poll_interval))
            .map_err(|e| SinkError::Startup(e.into()))?;

        self.worker = Some(handle);
        self.state = ControlState::Running;
        info!(
            "🚀 {}: worker thread started",
            "QUEUED_SINK".on_cyan().white()
        );
        Ok(())
    }

    /// Raise the stop request and return immediately.
    ///
    /// Idempotent; the worker observes the request on its next wakeup, which
    /// the queue condvar makes immediate even with an empty queue.
    pub fn begin_stop(&mut self) {
        self.queue.request_stop();
        if self.state == ControlState::Running {
            self.state = ControlState::StopPending;
        }
        info!("🛑 {}: stop requested", "QUEUED_SINK".on_cyan().white());
        self.downstream.on_begin_stop();
    }

    /// Wait for the worker thread to exit, join it, and transition to `Idle`.
    ///
    /// The wait is bounded by `end_stop_timeout`; on expiry the thread handle
    /// is kept so a later retry can wait again, and `SinkError::StuckWorker`
    /// is returned instead of hanging shutdown.
    pub fn end_stop(&mut self) -> Result<()> {
        if let Some(handle) = self.worker.take() {
            // The exit marker misses a worker that panicked inside the
            // downstream call; a finished handle covers that case.
            if !self.queue.wait_for_worker_exit(self.config.end_stop_timeout)
                && !handle.is_finished()
            {
                warn!(
                    "⚠️ {}: worker still running after {:?}",
                    "QUEUED_SINK".on_cyan().white(),
                    self.config.end_stop_timeout
                );
                self.worker = Some(handle);
                return Err(SinkError::StuckWorker {
                    waited: self.config.end_stop_timeout,
                });
            }
            // Worker already exited; this join cannot block.
            if handle.join().is_err() {
                warn!(
                    "⚠️ {}: worker thread panicked",
                    "QUEUED_SINK".on_cyan().white()
                );
            }
            self.queue.reset_for_start();
            self.state = ControlState::Idle;
            info!("✅ {}: worker joined", "QUEUED_SINK".on_cyan().white());
        }
        self.downstream.on_end_stop();
        Ok(())
    }

    /// Append one buffer to the queue. Never blocks.
    ///
    /// One buffer reference transfers to the queue; the worker (or a flush)
    /// releases it exactly once.
    pub fn submit(&self, buffer: Arc<AudioBuffer>) -> Result<()> {
        sink_debug!(
            "📥 QUEUED_SINK: submit {} frames @ {:?}",
            buffer.frame_count(),
            buffer.timestamp
        );
        self.queue.submit(buffer)
    }

    /// Discard every queued-but-unprocessed buffer, then call through to the
    /// downstream flush hook. Discarded buffers are never delivered.
    pub fn flush(&mut self) {
        let discarded = self.queue.flush();
        if discarded > 0 {
            info!(
                "🧹 {}: discarded {} unprocessed buffers",
                "QUEUED_SINK".on_cyan().white(),
                discarded
            );
        }
        self.downstream.on_begin_flush();
    }

    /// Forward the end-of-stream marker once the queue has drained.
    ///
    /// Blocks up to `eos_drain_timeout` so the marker is observed downstream
    /// only after the last buffer. On expiry the marker is forwarded anyway;
    /// stalling the pipeline indefinitely would be worse than an early marker.
    pub fn end_of_stream(&mut self) {
        if !self.queue.wait_for_drain(self.config.eos_drain_timeout) {
            warn!(
                "⏱️ {}: queue not drained after {:?}, forwarding end-of-stream with {} buffers pending",
                "QUEUED_SINK".on_cyan().white(),
                self.config.eos_drain_timeout,
                self.queue.len()
            );
        }
        self.downstream.on_end_of_stream();
    }

    /// Current control state
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Number of buffers currently queued
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Shared handle to the downstream collaborator
    pub fn downstream(&self) -> Arc<S> {
        Arc::clone(&self.downstream)
    }
}

impl<S: AudioSink + 'static> Drop for QueuedSink<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.queue.request_stop();
            if self.queue.wait_for_worker_exit(self.config.end_stop_timeout)
                || handle.is_finished()
            {
                let _ = handle.join();
            } else {
                // Detach rather than hang the dropping thread; the worker
                // still owns its queue and downstream Arcs and exits on its
                // own once it observes the stop request.
                warn!(
                    "⚠️ {}: dropping sink with worker still running, detaching",
                    "QUEUED_SINK".on_cyan().white()
                );
            }
        }
    }
}

/// Worker consumption loop: one thread per start/end_stop cycle.
///
/// Blocks in `get_next_sample` rather than busy-waiting; it is woken exactly
/// when there is work or a shutdown request. Marks itself exited as its final
/// act so `end_stop` can wait with a bounded timeout.
fn worker_loop<S: AudioSink>(queue: Arc<SampleQueue>, downstream: Arc<S>, poll: Duration) {
    let mut processed = 0u64;
    loop {
        match queue.get_next_sample(poll) {
            NextSample::Sample(buffer) => {
                sink_debug!(
                    "📤 SINK_WORKER: dequeued {} frames @ {:?}",
                    buffer.frame_count(),
                    buffer.timestamp
                );
                if let Err(e) = downstream.process_sample(buffer) {
                    warn!(
                        "⚠️ {}: downstream rejected buffer: {}",
                        "SINK_WORKER".on_cyan().white(),
                        e
                    );
                }
                processed += 1;
            }
            NextSample::ThreadStopping => break,
            NextSample::TimedOut => continue,
        }
    }
    queue.mark_worker_exited();
    info!(
        "✅ {}: exiting after {} buffers",
        "SINK_WORKER".on_cyan().white(),
        processed
    );
}
