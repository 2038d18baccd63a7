//! Bounded blocking buffers for SLIP pipelines.
//!
//! Two primitives, both safe to share between one producer thread and one
//! consumer thread:
//! - [`StreamBuffer`] is a byte FIFO with no message boundaries and a
//!   receive trigger level
//! - [`MessageBuffer`] is a FIFO of whole messages with all-or-nothing
//!   delivery and a query for the next message's length
//!
//! Every blocking call takes an `Option<Duration>` timeout. Timeouts are not
//! errors: they show up as a short (possibly zero) byte count. The only
//! runtime error is [`BufferError::Closed`], raised once a buffer has been
//! closed for teardown.

mod wait;

pub mod dynamic;
pub mod error;
pub mod message;
pub mod stream;
pub mod traits;

pub use dynamic::receive_dynamic;
pub use error::{BufferError, Result};
pub use message::{MessageBuffer, LENGTH_PREFIX_SIZE};
pub use stream::StreamBuffer;
pub use traits::{ByteChannel, MessageChannel};
