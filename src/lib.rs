pub mod log;
pub mod sink;

// Re-export sink types for testing and external use
pub use sink::{
    AudioBuffer, AudioSink, ControlState, NextSample, QueuedSink, SampleQueue, SampleWait,
    SinkConfig, SinkError,
};
