//! SLIP framing for serial links.
//!
//! slipway turns an unframed byte stream into packets and back, using the
//! SLIP (RFC 1055) byte-stuffing rules, and runs both directions
//! concurrently over bounded blocking buffers.
//!
//! # Crate Structure
//!
//! - [`buffer`]: bounded stream and message buffers, dynamic-size receive
//! - [`frame`]: the SLIP codec, `std::io` adapters, and a tokio codec
//!   (behind the `async` feature)
//! - [`pipeline`]: the threaded decode/encode pipeline
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let pipeline = slipway::Pipeline::create(1024, 1)?;
//! pipeline.send(b"hello", Some(Duration::from_secs(1)))?;
//!
//! let mut wire = [0u8; 16];
//! let n = pipeline.drain_output(&mut wire, Some(Duration::from_secs(1)))?;
//! pipeline.feed_input(&wire[..n], Some(Duration::from_secs(1)))?;
//!
//! let packet = pipeline.receive_dynamic(Some(Duration::from_secs(1)))?;
//! assert_eq!(packet.as_ref(), b"hello");
//! pipeline.destroy();
//! # Ok::<(), slipway::PipelineError>(())
//! ```

/// Re-export buffer types.
pub mod buffer {
    pub use slipway_buffer::*;
}

/// Re-export frame types.
pub mod frame {
    pub use slipway_frame::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use slipway_pipeline::*;
}

pub use slipway_pipeline::{Pipeline, PipelineConfig, PipelineError};
