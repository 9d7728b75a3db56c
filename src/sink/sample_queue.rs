use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::types::{AudioBuffer, NextSample, Result, SampleWait, SinkError};

/// Deadline for a wait; `None` means the timeout exceeds the representable
/// range and the wait is unbounded (`Duration::MAX` is the conventional
/// "wait forever").
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// One blocking step on `condvar`: waits until woken or until `deadline`.
/// Returns `None` when the deadline has passed.
fn wait_until<'a>(
    condvar: &Condvar,
    state: MutexGuard<'a, QueueState>,
    deadline: Option<Instant>,
) -> Option<MutexGuard<'a, QueueState>> {
    match deadline {
        Some(limit) => {
            let now = Instant::now();
            if now >= limit {
                return None;
            }
            Some(condvar.wait_timeout(state, limit - now).unwrap().0)
        }
        None => Some(condvar.wait(state).unwrap()),
    }
}

/// State guarded by the queue mutex.
///
/// Every signal transition happens under the same lock as the queue mutation
/// it mirrors: "data available" is exactly "buffers non-empty", so a woken
/// consumer can never observe the signal raised over an empty queue.
struct QueueState {
    buffers: VecDeque<Arc<AudioBuffer>>,
    stop_requested: bool,
    worker_exited: bool,
}

/// Unbounded FIFO handoff between one producer and one consumer.
///
/// The producer appends with [`submit`](SampleQueue::submit); the consumer
/// blocks in [`get_next_sample`](SampleQueue::get_next_sample) until a buffer
/// arrives, a stop is requested, or the timeout lapses. Stop is level
/// triggered: once requested it stays observable until explicitly cleared for
/// the next start cycle.
pub struct SampleQueue {
    state: Mutex<QueueState>,
    /// Wakes the consumer: buffer appended or stop requested
    wakeup: Condvar,
    /// Fires when the queue becomes empty or the worker exits
    drained: Condvar,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                buffers: VecDeque::new(),
                stop_requested: false,
                worker_exited: false,
            }),
            wakeup: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Append a buffer to the tail and wake the consumer. Never blocks.
    pub fn submit(&self, buffer: Arc<AudioBuffer>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .buffers
            .try_reserve(1)
            .map_err(|_| SinkError::Allocation)?;
        state.buffers.push_back(buffer);
        self.wakeup.notify_one();
        Ok(())
    }

    /// Block until a buffer is queued or a stop is requested.
    ///
    /// Stop wins over data when both hold, so shutdown is never starved by
    /// continuous submission. `TimedOut` is soft: poll again.
    pub fn wait_for_sample(&self, timeout: Duration) -> SampleWait {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock().unwrap();
        loop {
            if state.stop_requested {
                return SampleWait::ThreadStopping;
            }
            if !state.buffers.is_empty() {
                return SampleWait::Ready;
            }
            state = match wait_until(&self.wakeup, state, deadline) {
                Some(guard) => guard,
                None => return SampleWait::TimedOut,
            };
        }
    }

    /// Pop the head buffer, transferring its reference to the caller.
    ///
    /// Propagates `ThreadStopping` / `TimedOut` unchanged from the wait. The
    /// drain condition fires when the pop empties the queue.
    pub fn get_next_sample(&self, timeout: Duration) -> NextSample {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock().unwrap();
        loop {
            if state.stop_requested {
                return NextSample::ThreadStopping;
            }
            if let Some(buffer) = state.buffers.pop_front() {
                if state.buffers.is_empty() {
                    self.drained.notify_all();
                }
                return NextSample::Sample(buffer);
            }
            state = match wait_until(&self.wakeup, state, deadline) {
                Some(guard) => guard,
                None => return NextSample::TimedOut,
            };
        }
    }

    /// Discard every queued buffer, releasing each reference.
    ///
    /// Returns the number discarded. The data-available condition is false on
    /// return and the drain condition fires, all under one lock acquisition.
    pub fn flush(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let discarded = state.buffers.len();
        state.buffers.clear();
        self.drained.notify_all();
        discarded
    }

    /// Raise the stop request. Idempotent; never blocks.
    pub fn request_stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.stop_requested = true;
        self.wakeup.notify_all();
    }

    /// Clear the stop request and worker-exit marker for a new start cycle
    pub fn reset_for_start(&self) {
        let mut state = self.state.lock().unwrap();
        state.stop_requested = false;
        state.worker_exited = false;
    }

    /// Whether a stop has been requested and not yet cleared
    pub fn stop_requested(&self) -> bool {
        self.state.lock().unwrap().stop_requested
    }

    /// Worker calls this as its final act so `wait_for_worker_exit` can
    /// observe the exit with a bounded wait.
    pub fn mark_worker_exited(&self) {
        let mut state = self.state.lock().unwrap();
        state.worker_exited = true;
        self.drained.notify_all();
    }

    /// Block until the worker has marked itself exited, up to `timeout`.
    /// Returns false on expiry.
    pub fn wait_for_worker_exit(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock().unwrap();
        loop {
            if state.worker_exited {
                return true;
            }
            state = match wait_until(&self.drained, state, deadline) {
                Some(guard) => guard,
                None => return false,
            };
        }
    }

    /// Block until the queue is empty, up to `timeout`. Returns false on
    /// expiry with buffers still queued.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock().unwrap();
        loop {
            if state.buffers.is_empty() {
                return true;
            }
            state = match wait_until(&self.drained, state, deadline) {
                Some(guard) => guard,
                None => return false,
            };
        }
    }

    /// Number of queued buffers
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().buffers.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().buffers.is_empty()
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}
