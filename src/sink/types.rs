use std::sync::Arc;
use std::time::Duration;

/// A single interleaved audio buffer moving through the pipeline.
///
/// Buffers are shared via `Arc`: the queue holds one reference per enqueued
/// buffer, dequeue hands that reference to the consumer, and flush/teardown
/// drops it. Release is exactly-once by construction.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub timestamp: Duration,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32, timestamp: Duration) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            timestamp,
        }
    }

    /// Number of frames (samples per channel) in this buffer
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Buffer duration derived from frame count and sample rate
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

/// Control state of the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// No worker thread exists
    Idle,
    /// Worker thread is consuming the queue
    Running,
    /// Stop was requested; worker not yet joined
    StopPending,
}

/// Result of waiting on the sample queue without consuming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWait {
    /// A buffer is queued
    Ready,
    /// Stop was requested; the consumer must exit its loop
    ThreadStopping,
    /// Nothing arrived within the timeout; retry
    TimedOut,
}

/// Result of a dequeue attempt
#[derive(Debug)]
pub enum NextSample {
    /// Head buffer, ownership transferred to the caller
    Sample(Arc<AudioBuffer>),
    /// Stop was requested; the consumer must exit its loop
    ThreadStopping,
    /// Nothing arrived within the timeout; retry
    TimedOut,
}

/// Errors that can occur during sink operations
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink startup failed: {0}")]
    Startup(#[source] anyhow::Error),

    #[error("sample queue allocation failed")]
    Allocation,

    #[error("worker thread still running after {waited:?}")]
    StuckWorker { waited: Duration },
}

pub type Result<T> = std::result::Result<T, SinkError>;
