// Sink module - queued buffer handoff between a producer and a worker thread
//
// This module provides the sink's concurrency core broken down into logical components:
// - types: buffer type, control state, wait results, error taxonomy
// - sample_queue: lock-protected FIFO with its wakeup and drain conditions
// - queued_sink: worker lifecycle, control protocol, downstream call-through

pub mod queued_sink;
pub mod sample_queue;
pub mod types;

// Re-export commonly used types for easier imports
pub use queued_sink::{AudioSink, QueuedSink, SinkConfig};
pub use sample_queue::SampleQueue;
pub use types::{AudioBuffer, ControlState, NextSample, Result, SampleWait, SinkError};
