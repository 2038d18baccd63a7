//! Concurrent SLIP pipeline.
//!
//! A [`Pipeline`] runs a decoder thread and an encoder thread between four
//! bounded buffers. Raw serial bytes go in one side and come out as packets;
//! packets go in the other side and come out as escaped wire bytes. Both
//! directions apply backpressure and are torn down together.

pub mod config;
pub mod error;
pub mod pipeline;
mod units;

pub use config::{
    PipelineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MIN_STACK_SIZE, DEFAULT_TRIGGER_LEVEL,
};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
